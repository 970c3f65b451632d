//! Toolchain driver: run one external tool, synchronously, with explicit redirections.
//!
//! ## Design
//!
//! Every stage of every scenario goes through the same primitive, [`ToolRunner::run`], fed an [`Invocation`]
//! built by [`plan::plan_stage`]. The working directory is part of the invocation; the harness never changes the
//! process-wide current directory.
//!
//! The trait seam exists so the scenario controller can be exercised with scripted outcomes; [`ProcessRunner`]
//! is the only production implementation.

pub mod plan;

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use difftest_core::{FailureCause, StageOutcome};

use crate::error::{HarnessError, HarnessResult};

pub use plan::plan_stage;

/// Where the standard input of a tool comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// An empty stream.
    Null,
    File(PathBuf),
}

/// Where the standard output of a tool goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Discard,
    /// Truncate/create the file and write stdout into it.
    File(PathBuf),
}

/// A fully specified external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub stdin: InputSource,
    pub stdout: OutputSink,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            stdin: InputSource::Null,
            stdout: OutputSink::Discard,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn stdin(mut self, source: InputSource) -> Self {
        self.stdin = source;
        self
    }

    pub fn stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = sink;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Shell-like rendering for logs and dry runs: `prog arg… [< in] [> out]`.
    pub fn command_line(&self) -> String {
        let mut line = self.program_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let InputSource::File(path) = &self.stdin {
            line.push_str(&format!(" < {}", path.display()));
        }
        if let OutputSink::File(path) = &self.stdout {
            line.push_str(&format!(" > {}", path.display()));
        }
        line
    }
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub outcome: StageOutcome,
    /// File holding the captured stdout, when the invocation captured it.
    pub captured_stdout: Option<PathBuf>,
    /// Leading bytes of the tool's stderr. Informational only.
    pub diagnostics: Vec<u8>,
}

impl ProcessOutcome {
    pub fn new(outcome: StageOutcome) -> Self {
        Self {
            outcome,
            captured_stdout: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics_text(&self) -> String {
        String::from_utf8_lossy(&self.diagnostics).into_owned()
    }
}

/// Run external tools.
pub trait ToolRunner {
    /// Run `invocation` to completion (or timeout).
    ///
    /// ## Errors
    ///
    /// Only for infrastructure problems: the program could not be spawned, a redirection file could not be opened.
    /// A tool that ran and failed is an `Ok` with [`StageOutcome::Failure`].
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome>;
}

/// Runs tools as child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    diagnostics_limit: usize,
}

impl ProcessRunner {
    pub fn new(diagnostics_limit: usize) -> Self {
        Self { diagnostics_limit }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DIAGNOSTICS_LIMIT)
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome> {
        let program = invocation.program_name();
        let redirect_error = |path: &Path, source: io::Error| HarnessError::Redirect {
            program: program.clone(),
            path: path.to_path_buf(),
            source,
        };

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).current_dir(&invocation.working_dir);
        // Own process group, so a timeout reaches everything the tool started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            command.process_group(0);
        }

        match &invocation.stdin {
            InputSource::Null => {
                command.stdin(Stdio::null());
            }
            InputSource::File(path) => {
                let file = File::open(path).map_err(|e| redirect_error(path, e))?;
                command.stdin(Stdio::from(file));
            }
        }

        let captured_stdout = match &invocation.stdout {
            OutputSink::Discard => {
                command.stdout(Stdio::null());
                None
            }
            OutputSink::File(path) => {
                let file = File::create(path).map_err(|e| redirect_error(path, e))?;
                command.stdout(Stdio::from(file));
                Some(path.clone())
            }
        };

        // Stderr goes to an unnamed file inside the working directory so nothing escapes the workspace and nothing
        // is left behind.
        let mut diagnostics_file =
            tempfile::tempfile_in(&invocation.working_dir).map_err(|e| redirect_error(&invocation.working_dir, e))?;
        let stderr_handle = diagnostics_file
            .try_clone()
            .map_err(|e| redirect_error(&invocation.working_dir, e))?;
        command.stderr(Stdio::from(stderr_handle));

        tracing::debug!(command = %invocation.command_line(), cwd = %invocation.working_dir.display(), "spawning");

        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: program.clone(),
            source,
        })?;
        // Close the parent's copies of the redirection handles before waiting.
        drop(command);

        let (status, timed_out) =
            wait_with_timeout(&mut child, invocation.timeout).map_err(|source| HarnessError::Wait {
                program: program.clone(),
                source,
            })?;

        let outcome = match (timed_out, invocation.timeout) {
            (true, Some(limit)) => StageOutcome::Failure(FailureCause::TimedOut(limit)),
            _ => classify_status(status),
        };

        let diagnostics = read_capped(&mut diagnostics_file, self.diagnostics_limit).unwrap_or_else(|e| {
            tracing::warn!("could not read diagnostics of '{}': {}", program, e);
            Vec::new()
        });

        Ok(ProcessOutcome {
            outcome,
            captured_stdout,
            diagnostics,
        })
    }
}

/// Map an exit status to a stage outcome; signal terminations keep their signal number.
fn classify_status(status: ExitStatus) -> StageOutcome {
    if status.success() {
        return StageOutcome::Success;
    }
    if let Some(code) = status.code() {
        return StageOutcome::Failure(FailureCause::Exit(code));
    }

    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal: Option<i32> = None;

    match signal {
        Some(sig) => StageOutcome::Failure(FailureCause::Signal(sig)),
        None => StageOutcome::Failure(FailureCause::Exit(1)),
    }
}

/// Wait for `child`, killing it once `timeout` elapses. Returns the status and whether the deadline was hit.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        return Ok((child.wait()?, false));
    };

    let deadline = Instant::now().checked_add(limit);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill_tree(child);
            let status = child.wait()?;
            return Ok((status, true));
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Kill `child` and every process in its group. The child is not reaped yet, so its pid still names the group.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_tree(child: &mut Child) {
    match libc::pid_t::try_from(child.id()) {
        Ok(pgid) => {
            // SAFETY: plain syscall on a process group this runner created; no memory is shared.
            let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
            if rc == -1 {
                let _ = child.kill();
            }
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

fn read_capped(file: &mut File, cap: usize) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.by_ref().take(cap as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Delete `path` if it exists, so a stale artifact from an earlier run can not pass for fresh output.
pub fn remove_stale_artifact(path: &Path) -> HarnessResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("removed stale artifact {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(HarnessError::StaleArtifact {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let inv = Invocation::new("java", "/ws")
            .arg("Add")
            .stdin(InputSource::File(PathBuf::from("Add.in")))
            .stdout(OutputSink::File(PathBuf::from("Add.java.log")));
        assert_eq!(inv.command_line(), "java Add < Add.in > Add.java.log");
    }

    #[test]
    fn test_remove_stale_artifact_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let asm = dir.path().join("Add.s");
        remove_stale_artifact(&asm).unwrap();

        fs::write(&asm, "stale").unwrap();
        remove_stale_artifact(&asm).unwrap();
        assert!(!asm.exists());
    }

    #[test]
    fn test_spawn_failure_is_an_error_not_a_stage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("difftest-this-tool-does-not-exist", dir.path());
        let err = ProcessRunner::default().run(&inv).unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[test]
    fn test_missing_stdin_fixture_is_a_redirect_error() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("true", dir.path()).stdin(InputSource::File(dir.path().join("nope.in")));
        let err = ProcessRunner::default().run(&inv).unwrap_err();
        assert!(matches!(err, HarnessError::Redirect { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_and_capture() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("out.log");
        let inv = Invocation::new("sh", dir.path())
            .args(["-c", "printf hello; echo oops >&2; exit 3"])
            .stdout(OutputSink::File(log.clone()));

        let result = ProcessRunner::default().run(&inv).unwrap();
        assert_eq!(result.outcome, StageOutcome::Failure(FailureCause::Exit(3)));
        assert_eq!(result.captured_stdout.as_deref(), Some(log.as_path()));
        assert_eq!(fs::read_to_string(&log).unwrap(), "hello");
        assert_eq!(result.diagnostics_text(), "oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_file_is_fed_to_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let log = dir.path().join("out.log");
        fs::write(&input, "42\n").unwrap();

        let inv = Invocation::new("cat", dir.path())
            .stdin(InputSource::File(input))
            .stdout(OutputSink::File(log.clone()));
        let result = ProcessRunner::default().run(&inv).unwrap();

        assert!(result.outcome.is_success());
        assert_eq!(fs::read_to_string(&log).unwrap(), "42\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_diagnostics_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).args(["-c", "printf 0123456789 >&2"]);
        let result = ProcessRunner::new(4).run(&inv).unwrap();
        assert_eq!(result.diagnostics, b"0123");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sleep", dir.path())
            .arg("10")
            .timeout(Some(Duration::from_millis(100)));

        let start = Instant::now();
        let result = ProcessRunner::default().run(&inv).unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(
            result.outcome,
            StageOutcome::Failure(FailureCause::TimedOut(Duration::from_millis(100)))
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_kills_background_children() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path())
            .args(["-c", "sleep 30 & echo $! > bg.pid; wait"])
            .timeout(Some(Duration::from_millis(300)));

        let result = ProcessRunner::default().run(&inv).unwrap();
        assert_eq!(
            result.outcome,
            StageOutcome::Failure(FailureCause::TimedOut(Duration::from_millis(300)))
        );

        let pid = fs::read_to_string(dir.path().join("bg.pid")).unwrap();
        let pid = pid.trim();
        // Gone, or a zombie waiting for whoever adopted it.
        let alive = || {
            fs::read_to_string(format!("/proc/{}/stat", pid))
                .map(|stat| {
                    let state = stat.rsplit(')').next().unwrap_or("").trim_start();
                    !state.starts_with('Z')
                })
                .unwrap_or(false)
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        while alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!alive(), "background process {} outlived the stage", pid);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_termination_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).args(["-c", "kill -9 $$"]);
        let result = ProcessRunner::default().run(&inv).unwrap();
        assert_eq!(result.outcome, StageOutcome::Failure(FailureCause::Signal(9)));
        assert_eq!(result.outcome.exit_code(), 137);
    }
}
