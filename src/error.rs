//! Infrastructure errors.
//!
//! A [`HarnessError`] means the harness could not carry out a test at all: the workspace could not be created,
//! a tool could not be spawned, a redirection file could not be opened. It is never used for a stage that ran and
//! failed; those are [`difftest_core::StageOutcome::Failure`] values interpreted by the scenario policy.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("input program '{}' does not exist or is not a file", path.display())]
    #[diagnostic(code(difftest::input::missing))]
    MissingInput { path: PathBuf },

    #[error("input program '{}' has no usable file name", path.display())]
    #[diagnostic(code(difftest::input::invalid))]
    InvalidInput { path: PathBuf },

    #[error("failed to create test workspace")]
    #[diagnostic(code(difftest::workspace::create), help("check that TMPDIR points at a writable directory"))]
    WorkspaceCreate(#[source] io::Error),

    #[error("failed to stage '{}' into the workspace", path.display())]
    #[diagnostic(code(difftest::workspace::stage))]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove test workspace '{}'", path.display())]
    #[diagnostic(code(difftest::workspace::remove))]
    WorkspaceRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start '{program}'")]
    #[diagnostic(
        code(difftest::driver::spawn),
        help("make sure the tool exists and is executable, or override it on the command line")
    )]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to set up redirection '{}' for '{program}'", path.display())]
    #[diagnostic(code(difftest::driver::redirect))]
    Redirect {
        program: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lost track of '{program}' while waiting for it")]
    #[diagnostic(code(difftest::driver::wait))]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove stale artifact '{}'", path.display())]
    #[diagnostic(code(difftest::driver::stale))]
    StaleArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to compare '{}' with '{}'", left.display(), right.display())]
    #[diagnostic(code(difftest::compare))]
    Compare {
        left: PathBuf,
        right: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type HarnessResult<T> = Result<T, HarnessError>;
