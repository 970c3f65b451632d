//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use difftest_core::{ArtifactPaths, Scenario, TestCase, Verdict};

use super::{CliError, CliResult, ExitCode, ToolArgs, ToolOverrides};
use crate::config::ToolchainConfig;
use crate::controller::run_case;
use crate::driver::{ProcessRunner, plan_stage};
use crate::error::HarnessError;
use crate::workspace::discover_case;

/// Placeholder shown for the workspace directory in dry runs.
const WORKSPACE_PLACEHOLDER: &str = "$WORKSPACE";

/// Build the toolchain configuration for one invocation.
///
/// Tools run inside the workspace, so every path given relative to the caller's directory is made absolute.
/// A bare compiler name without a separator (`mjc`) is left alone and resolved through `PATH`.
pub fn toolchain_config(tools: &ToolArgs) -> CliResult<ToolchainConfig> {
    resolve_toolchain(&tools.compiler, &tools.runtime, &tools.overrides)
}

pub(crate) fn resolve_toolchain(
    compiler: &Path,
    runtime: &Path,
    overrides: &ToolOverrides,
) -> CliResult<ToolchainConfig> {
    let compiler = if compiler.components().count() > 1 {
        absolutize(compiler)?
    } else {
        compiler.to_path_buf()
    };
    let runtime = absolutize(runtime)?;

    overrides.apply(ToolchainConfig::new(compiler, runtime))
}

/// Make `path` absolute without requiring it to exist. Symlinks are not resolved, so a linked source keeps its
/// own name and its own sibling fixture.
fn absolutize(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| CliError::failure(format!("Error: cannot determine current directory: {}", e)))
}

/// Render an infrastructure error with miette on stderr.
pub(crate) fn report_harness_error(error: HarnessError) {
    eprintln!("{:?}", miette::Report::new(error));
}

/// Run one scenario on one input and print the progress line and verdict.
pub fn run_single(scenario: Scenario, tools: &ToolArgs) -> CliResult<ExitCode> {
    let config = toolchain_config(tools)?;

    let input = absolutize(&tools.input)?;
    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    println!("{} {}:", scenario.label(), base);
    let _ = io::stdout().flush();

    let runner = ProcessRunner::new(config.diagnostics_limit);
    let verdict = match discover_case(&input).and_then(|case| run_case(scenario, &config, &runner, &case)) {
        Ok(report) => {
            tracing::debug!("{} {}: {} ({:.2}s)", scenario, base, report.summary(), report.elapsed().as_secs_f64());
            report.verdict
        }
        Err(e) => {
            report_harness_error(e);
            Verdict::Fail
        }
    };

    println!("{}", verdict);
    Ok(ExitCode(verdict.exit_code()))
}

/// Print the invocations `scenario` would perform for `tools.input`, one per line.
pub fn print_plan(scenario: Scenario, tools: &ToolArgs) -> CliResult<ExitCode> {
    let config = toolchain_config(tools)?;
    let case = TestCase::from_source(&tools.input, None)
        .ok_or_else(|| CliError::failure(format!("Error: '{}' has no file name", tools.input.display())))?;
    let with_fixture = difftest_core::fixture_path_for(&tools.input).is_file();

    for line in plan_lines(scenario, &config, &case, with_fixture) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}

/// `<stage>: <command line>` for each stage of `scenario`, against a placeholder workspace.
pub fn plan_lines(scenario: Scenario, config: &ToolchainConfig, case: &TestCase, with_fixture: bool) -> Vec<String> {
    let names = ArtifactPaths::derive(case);
    let workdir = Path::new(WORKSPACE_PLACEHOLDER);

    let mut lines: Vec<String> = scenario
        .pipeline()
        .iter()
        .map(|stage| {
            let invocation = plan_stage(*stage, config, &names, workdir, with_fixture);
            format!("{}: {}", stage, invocation.command_line())
        })
        .collect();

    if let difftest_core::Completion::CompareLogs = scenario.on_completion() {
        let located = names.located_in(workdir);
        lines.push(format!(
            "compare: {} {}",
            located.reference_log.display(),
            located.native_log.display()
        ));
    }
    lines
}
