//! CLI module for the difftest harness
//!
//! ## Commands
//!
//! - `compilation <COMPILER> <RUNTIME> <INPUT>` - outputs of both pipelines must match
//! - `compile-error <COMPILER> <RUNTIME> <INPUT>` - the compiler under test must reject the program
//! - `runtime-error <COMPILER> <RUNTIME> <INPUT>` - the built program must fail when run
//! - `suite [PATH...]` - run every program found under the given paths
//! - `plan <SCENARIO> <COMPILER> <RUNTIME> <INPUT>` - print the stage commands without running anything
//!
//! The three scenario commands also ship as standalone binaries (`test-compilation`, `test-compile-error`,
//! `test-runtime-error`) taking the same three positionals.
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` functions handle errors and exit.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod suite;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use difftest_core::Scenario;

use crate::config::{ToolCommand, ToolchainConfig};
use crate::version::DIFFTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Differential test harness for a compiler under test
#[derive(Parser, Debug)]
#[command(name = "difftest")]
#[command(version = DIFFTEST_VERSION)]
#[command(about = "Differential test harness for a compiler under test", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Both pipelines must build, run and print identical output
    Compilation(ToolArgs),

    /// The compiler under test must refuse to build the program
    CompileError(ToolArgs),

    /// The program must build and then fail when executed
    RuntimeError(ToolArgs),

    /// Run every program found under the given paths
    Suite(suite::SuiteArgs),

    /// Print the commands a scenario would run, without running them
    Plan {
        /// compilation, compile-error or runtime-error
        #[arg(value_name = "SCENARIO")]
        scenario: Scenario,
        #[command(flatten)]
        tools: ToolArgs,
    },
}

/// The three positionals every scenario needs, plus toolchain overrides.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Compiler under test
    #[arg(value_name = "COMPILER")]
    pub compiler: PathBuf,
    /// Runtime support source linked into every native executable
    #[arg(value_name = "RUNTIME")]
    pub runtime: PathBuf,
    /// Program to test
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    #[command(flatten)]
    pub overrides: ToolOverrides,
}

/// Optional replacements for the reference toolchain and the assembler.
#[derive(Args, Debug, Clone)]
pub struct ToolOverrides {
    /// Reference compiler command
    #[arg(long, value_name = "CMD", default_value = "javac")]
    pub javac: String,
    /// Reference runtime command
    #[arg(long, value_name = "CMD", default_value = "java")]
    pub java: String,
    /// Assembler/linker command
    #[arg(long, value_name = "CMD", default_value = "gcc -m32")]
    pub cc: String,
    /// Kill any stage running longer than this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl ToolOverrides {
    /// Apply the overrides on top of a base configuration.
    pub fn apply(&self, config: ToolchainConfig) -> CliResult<ToolchainConfig> {
        let parse = |flag: &str, spec: &str| {
            ToolCommand::parse(spec).ok_or_else(|| CliError::failure(format!("Error: --{flag} needs a command")))
        };
        Ok(config
            .with_reference_compiler(parse("javac", &self.javac)?)
            .with_reference_runtime(parse("java", &self.java)?)
            .with_assembler(parse("cc", &self.cc)?)
            .with_stage_timeout(self.timeout.map(Duration::from_secs)))
    }
}

/// Command line of the standalone per-scenario binaries.
#[derive(Parser, Debug)]
#[command(version = DIFFTEST_VERSION)]
pub struct ScenarioCli {
    #[command(flatten)]
    pub tools: ToolArgs,
}

// ============================================================================
// CLI entry points
// ============================================================================

/// Initialize structured logging on stderr with env-based filter, defaulting to warn.
///
/// Stdout is reserved for progress lines and verdicts.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called for `difftest`. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = parse_or_exit::<Cli>();
    finish(execute(cli));
}

/// Entry point of the standalone scenario binaries.
pub fn run_scenario_binary(scenario: Scenario) {
    let cli = parse_or_exit::<ScenarioCli>();
    finish(commands::run_single(scenario, &cli.tools));
}

/// Parse the command line; usage errors exit with status 1 before any work starts.
fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not errors.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            process::exit(code.0);
        }
    }
}

fn finish(result: CliResult<ExitCode>) {
    match result {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Compilation(tools) => commands::run_single(Scenario::Equivalence, &tools),
        Command::CompileError(tools) => commands::run_single(Scenario::BuildRejection, &tools),
        Command::RuntimeError(tools) => commands::run_single(Scenario::RunRejection, &tools),
        Command::Suite(args) => suite::run_suite(&args),
        Command::Plan { scenario, tools } => commands::print_plan(scenario, &tools),
    }
}

// ============================================================================
// Tests
// ============================================================================
