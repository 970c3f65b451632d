//! Stage outcomes and verdicts.

use std::fmt;
use std::time::Duration;

/// Why a stage did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The process exited with a non-zero status.
    Exit(i32),
    /// The process was terminated by a signal (unix only).
    Signal(i32),
    /// The process exceeded the configured stage timeout and was killed.
    TimedOut(Duration),
}

impl FailureCause {
    /// Raw status code in shell convention: signals map to `128 + signal`, timeouts to `124` like `timeout(1)`.
    pub fn exit_code(&self) -> i32 {
        match self {
            FailureCause::Exit(code) => *code,
            FailureCause::Signal(sig) => 128 + sig,
            FailureCause::TimedOut(_) => 124,
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Exit(code) => write!(f, "exit status {code}"),
            FailureCause::Signal(sig) => write!(f, "terminated by signal {sig}"),
            FailureCause::TimedOut(after) => write!(f, "timed out after {:.1}s", after.as_secs_f64()),
        }
    }
}

/// Result of one external tool invocation, as far as the verdict is concerned.
///
/// Deliberately not a `bool`: rejection scenarios treat `Failure` as the expected signal, and matching on a named
/// variant keeps that inversion explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    Failure(FailureCause),
}

impl StageOutcome {
    /// Classify a raw exit code (`0` is success).
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            StageOutcome::Success
        } else {
            StageOutcome::Failure(FailureCause::Exit(code))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            StageOutcome::Success => 0,
            StageOutcome::Failure(cause) => cause.exit_code(),
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Success => write!(f, "success"),
            StageOutcome::Failure(cause) => write!(f, "failure ({cause})"),
        }
    }
}

/// Terminal result of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Ok,
    Fail,
}

impl Verdict {
    /// `Ok` if `passed`, else `Fail`.
    pub fn from_pass(passed: bool) -> Self {
        if passed { Verdict::Ok } else { Verdict::Fail }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    /// Process exit status for this verdict: `0` for `Ok`, `1` for `Fail`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Ok => 0,
            Verdict::Fail => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
