//! Provide the shared vocabulary and verdict policy of the difftest harness.
//!
//! This crate describes *what* a differential test is, not how it is executed:
//! - [`case`]: the test unit and the fixed artifact naming scheme derived from it,
//! - [`outcome`]: stage outcomes and the final verdict,
//! - [`scenario`]: the three scenario pipelines and the rules that turn stage outcomes into a verdict.
//!
//! ## Notes
//!
//! - This is a “semantic core” crate: **no process spawning**, no global state, no dependencies.
//! - The only filesystem-adjacent code is path arithmetic; probing whether a stdin fixture exists is left to the
//!   harness crate.

pub mod case;
pub mod outcome;
pub mod scenario;

pub use case::{ArtifactPaths, TestCase, fixture_path_for};
pub use outcome::{FailureCause, StageOutcome, Verdict};
pub use scenario::{Completion, CompilerOutput, RunMode, Scenario, Stage, UnknownScenario};
