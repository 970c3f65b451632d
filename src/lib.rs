#![deny(unsafe_code)]
//! difftest: differential testing of a compiler against a reference toolchain
//!
//! The same program goes through two pipelines, the reference compiler plus its runtime and the compiler under
//! test plus the native assembler/linker, and the harness compares what comes out. Three scenarios share one
//! engine: output equivalence, expected rejection at build time, expected failure at run time.
//!
//! ## Layout
//!
//! - [`workspace`]: one disposable directory per test run
//! - [`driver`]: uniform external-tool invocation and the stage planner
//! - [`compare`]: byte-exact log comparison
//! - [`controller`]: runs a scenario pipeline and produces the verdict
//! - [`cli`]: command-line entry points and suite reporters
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod compare;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod version;
pub mod workspace;

pub use difftest_core::{ArtifactPaths, Scenario, Stage, StageOutcome, TestCase, Verdict};

pub use config::{ToolCommand, ToolchainConfig};
pub use controller::{ScenarioReport, run_case, run_case_in, run_scenario};
pub use driver::{ProcessRunner, ToolRunner};
pub use error::{HarnessError, HarnessResult};
