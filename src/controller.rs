//! Scenario controller: sequence the stages of a scenario and turn their outcomes into a verdict.
//!
//! The rules live in [`difftest_core::scenario`]; this module only executes them. Stages run strictly in order and
//! the pipeline stops at the first failing stage, so no later stage is invoked and no later artifact is created.

use std::path::Path;
use std::time::{Duration, Instant};

use difftest_core::{Completion, Scenario, Stage, StageOutcome, TestCase, Verdict};

use crate::compare::{Comparison, compare_files};
use crate::config::ToolchainConfig;
use crate::driver::{ToolRunner, plan_stage, remove_stale_artifact};
use crate::error::HarnessResult;
use crate::workspace::{StagedCase, Workspace};

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

/// Everything a scenario run decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub verdict: Verdict,
    /// Executed stages, in order. Ends at the first failure, if any.
    pub trace: Vec<StageRecord>,
    /// Log comparison, when the scenario got that far.
    pub comparison: Option<Comparison>,
}

impl ScenarioReport {
    /// The stage that stopped the pipeline, if one failed.
    pub fn failed_stage(&self) -> Option<&StageRecord> {
        self.trace.last().filter(|r| !r.outcome.is_success())
    }

    pub fn elapsed(&self) -> Duration {
        self.trace.iter().map(|r| r.elapsed).sum()
    }

    /// One-line explanation of the verdict, for reporters.
    pub fn summary(&self) -> String {
        if let Some(record) = self.failed_stage() {
            return format!("{} stage: {}", record.stage, record.outcome);
        }
        match self.comparison {
            Some(Comparison::Identical) => "outputs identical".to_string(),
            Some(Comparison::Differs { offset }) => format!("outputs differ at byte {offset}"),
            None => "all stages succeeded".to_string(),
        }
    }
}

/// Run `scenario` on an already staged case.
///
/// ## Errors
///
/// Only infrastructure failures (see [`crate::error::HarnessError`]); every stage failure yields a verdict.
pub fn run_scenario(
    scenario: Scenario,
    config: &ToolchainConfig,
    runner: &dyn ToolRunner,
    staged: &StagedCase,
) -> HarnessResult<ScenarioReport> {
    let mut trace = Vec::with_capacity(scenario.pipeline().len());

    if staged.has_stdin_fixture() && !scenario.uses_stdin_fixture() {
        tracing::debug!("{} ignores the stdin fixture of {}", scenario, staged.case().base_name());
    }

    for &stage in scenario.pipeline() {
        if let Stage::CompileUnderTest(_) = stage {
            remove_stale_artifact(&staged.paths().assembly)?;
        }

        let invocation = plan_stage(
            stage,
            config,
            staged.names(),
            staged.workdir(),
            staged.has_stdin_fixture(),
        );

        let start = Instant::now();
        let result = runner.run(&invocation)?;
        let elapsed = start.elapsed();

        tracing::debug!(
            stage = %stage,
            outcome = %result.outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "{}",
            invocation.command_line()
        );
        trace.push(StageRecord {
            stage,
            outcome: result.outcome,
            elapsed,
        });

        if let StageOutcome::Failure(cause) = result.outcome {
            tracing::info!("{} stage failed: {}", stage, cause);
            if !result.diagnostics.is_empty() {
                tracing::debug!(stage = %stage, "diagnostics:\n{}", result.diagnostics_text().trim_end());
            }
            return Ok(ScenarioReport {
                scenario,
                verdict: scenario.verdict_on_failure(stage),
                trace,
                comparison: None,
            });
        }
    }

    let (verdict, comparison) = match scenario.on_completion() {
        Completion::Verdict(verdict) => (verdict, None),
        Completion::CompareLogs => {
            let paths = staged.paths();
            let comparison = compare_files(&paths.reference_log, &paths.native_log)?;
            if let Comparison::Differs { offset } = comparison {
                tracing::info!("output mismatch at byte {}", offset);
            }
            (Verdict::from_pass(comparison.is_identical()), Some(comparison))
        }
    };

    Ok(ScenarioReport {
        scenario,
        verdict,
        trace,
        comparison,
    })
}

/// Create a workspace, stage `case`, run `scenario`, remove the workspace.
pub fn run_case(
    scenario: Scenario,
    config: &ToolchainConfig,
    runner: &dyn ToolRunner,
    case: &TestCase,
) -> HarnessResult<ScenarioReport> {
    run_in_workspace(Workspace::create()?, scenario, config, runner, case)
}

/// Like [`run_case`], with the workspace created under `root`.
pub fn run_case_in(
    root: &Path,
    scenario: Scenario,
    config: &ToolchainConfig,
    runner: &dyn ToolRunner,
    case: &TestCase,
) -> HarnessResult<ScenarioReport> {
    run_in_workspace(Workspace::create_in(root)?, scenario, config, runner, case)
}

fn run_in_workspace(
    workspace: Workspace,
    scenario: Scenario,
    config: &ToolchainConfig,
    runner: &dyn ToolRunner,
    case: &TestCase,
) -> HarnessResult<ScenarioReport> {
    // On `?` the workspace is dropped, which removes it as well.
    let staged = workspace.stage(case)?;
    let report = run_scenario(scenario, config, runner, &staged)?;

    if let Err(e) = workspace.close() {
        tracing::warn!("{}", e);
    }
    Ok(report)
}
