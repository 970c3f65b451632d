//! Scenario pipelines and verdict policy.
//!
//! A scenario is a fixed, linear list of [`Stage`]s plus two rules:
//! - what the verdict is when a given stage fails (the pipeline stops there), and
//! - what happens when every stage succeeds.
//!
//! | Scenario | Stage fails | All stages succeed |
//! |---|---|---|
//! | `Equivalence` | `FAIL` | compare logs |
//! | `BuildRejection` | `OK` | `FAIL` |
//! | `RunRejection` | build stage: `FAIL`, native run: `OK` | `FAIL` |

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::outcome::Verdict;

/// What happens to the standard output of the compiler under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerOutput {
    /// Discard stdout; the compiler is expected to write `<base>.s` itself.
    Discard,
    /// Redirect stdout into `<base>.s`, treating whatever the compiler prints as the candidate assembly.
    AsAssembly,
}

/// How the native executable is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Feed the stdin fixture (if any) and capture stdout into `<base>.bin.log`.
    Captured,
    /// Null stdin, stdout discarded; only the exit status matters.
    Bare,
}

/// One external tool invocation within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ReferenceCompile,
    ReferenceRun,
    CompileUnderTest(CompilerOutput),
    AssembleLink,
    NativeRun(RunMode),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ReferenceCompile => "reference-compile",
            Stage::ReferenceRun => "reference-run",
            Stage::CompileUnderTest(_) => "compile",
            Stage::AssembleLink => "assemble-link",
            Stage::NativeRun(_) => "native-run",
        }
    }

    /// `true` for the stages that produce the native executable.
    pub fn is_build_stage(&self) -> bool {
        matches!(self, Stage::CompileUnderTest(_) | Stage::AssembleLink)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a scenario does once every stage of its pipeline succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Compare the reference log with the native log byte for byte.
    CompareLogs,
    /// The verdict is fixed.
    Verdict(Verdict),
}

/// The three verification policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Both pipelines succeed and print the same bytes.
    Equivalence,
    /// The compiler under test (or the assembler downstream of it) refuses the program.
    BuildRejection,
    /// The program builds, and the native executable exits non-zero.
    RunRejection,
}

const EQUIVALENCE_PIPELINE: &[Stage] = &[
    Stage::ReferenceCompile,
    Stage::ReferenceRun,
    Stage::CompileUnderTest(CompilerOutput::Discard),
    Stage::AssembleLink,
    Stage::NativeRun(RunMode::Captured),
];

const BUILD_REJECTION_PIPELINE: &[Stage] = &[Stage::CompileUnderTest(CompilerOutput::AsAssembly), Stage::AssembleLink];

const RUN_REJECTION_PIPELINE: &[Stage] = &[
    Stage::CompileUnderTest(CompilerOutput::AsAssembly),
    Stage::AssembleLink,
    Stage::NativeRun(RunMode::Bare),
];

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Equivalence, Scenario::BuildRejection, Scenario::RunRejection];

    /// Canonical command-line name.
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Equivalence => "compilation",
            Scenario::BuildRejection => "compile-error",
            Scenario::RunRejection => "runtime-error",
        }
    }

    /// Progress label printed before the verdict.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Equivalence => "Testing (x86)",
            Scenario::BuildRejection => "Testing (should fail, compiletime)",
            Scenario::RunRejection => "Testing (should fail, runtime)",
        }
    }

    /// Stages in execution order.
    pub fn pipeline(&self) -> &'static [Stage] {
        match self {
            Scenario::Equivalence => EQUIVALENCE_PIPELINE,
            Scenario::BuildRejection => BUILD_REJECTION_PIPELINE,
            Scenario::RunRejection => RUN_REJECTION_PIPELINE,
        }
    }

    /// Verdict when `stage` fails. The pipeline never continues past a failed stage.
    pub fn verdict_on_failure(&self, stage: Stage) -> Verdict {
        match (self, stage) {
            (Scenario::Equivalence, _) => Verdict::Fail,
            (Scenario::BuildRejection, _) => Verdict::Ok,
            // A program that never built says nothing about its runtime behavior.
            (Scenario::RunRejection, Stage::NativeRun(_)) => Verdict::Ok,
            (Scenario::RunRejection, _) => Verdict::Fail,
        }
    }

    pub fn on_completion(&self) -> Completion {
        match self {
            Scenario::Equivalence => Completion::CompareLogs,
            Scenario::BuildRejection | Scenario::RunRejection => Completion::Verdict(Verdict::Fail),
        }
    }

    /// Whether the scenario stages the stdin fixture and feeds it to the runs.
    pub fn uses_stdin_fixture(&self) -> bool {
        self.pipeline()
            .iter()
            .any(|s| matches!(s, Stage::ReferenceRun | Stage::NativeRun(RunMode::Captured)))
    }

    /// Infer the scenario from a conventional test-suite layout.
    ///
    /// `…/RuntimeErrors/…` selects `RunRejection`, `…/ParseErrors/…` and `…/TypeErrors/…` select
    /// `BuildRejection`; anything else is `Equivalence`. The nearest matching ancestor wins.
    pub fn infer_from_path(path: &Path) -> Scenario {
        for component in path.components().rev() {
            match component.as_os_str().to_str() {
                Some("RuntimeErrors") => return Scenario::RunRejection,
                Some("ParseErrors") | Some("TypeErrors") => return Scenario::BuildRejection,
                _ => {}
            }
        }
        Scenario::Equivalence
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a scenario name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScenario(pub String);

impl fmt::Display for UnknownScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown scenario '{}' (expected compilation, compile-error or runtime-error)",
            self.0
        )
    }
}

impl std::error::Error for UnknownScenario {}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compilation" | "equivalence" => Ok(Scenario::Equivalence),
            "compile-error" | "build-rejection" => Ok(Scenario::BuildRejection),
            "runtime-error" | "run-rejection" => Ok(Scenario::RunRejection),
            other => Err(UnknownScenario(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_fails_on_any_stage() {
        for stage in Scenario::Equivalence.pipeline() {
            assert_eq!(Scenario::Equivalence.verdict_on_failure(*stage), Verdict::Fail);
        }
        assert_eq!(Scenario::Equivalence.on_completion(), Completion::CompareLogs);
    }

    #[test]
    fn test_build_rejection_accepts_any_failure() {
        for stage in Scenario::BuildRejection.pipeline() {
            assert_eq!(Scenario::BuildRejection.verdict_on_failure(*stage), Verdict::Ok);
        }
        assert_eq!(
            Scenario::BuildRejection.on_completion(),
            Completion::Verdict(Verdict::Fail)
        );
    }

    #[test]
    fn test_run_rejection_distinguishes_build_and_run() {
        let s = Scenario::RunRejection;
        assert_eq!(
            s.verdict_on_failure(Stage::CompileUnderTest(CompilerOutput::AsAssembly)),
            Verdict::Fail
        );
        assert_eq!(s.verdict_on_failure(Stage::AssembleLink), Verdict::Fail);
        assert_eq!(s.verdict_on_failure(Stage::NativeRun(RunMode::Bare)), Verdict::Ok);
        assert_eq!(s.on_completion(), Completion::Verdict(Verdict::Fail));
    }

    #[test]
    fn test_rejection_pipelines_capture_compiler_stdout() {
        assert_eq!(
            Scenario::BuildRejection.pipeline()[0],
            Stage::CompileUnderTest(CompilerOutput::AsAssembly)
        );
        assert_eq!(
            Scenario::RunRejection.pipeline()[0],
            Stage::CompileUnderTest(CompilerOutput::AsAssembly)
        );
        assert!(
            Scenario::Equivalence
                .pipeline()
                .contains(&Stage::CompileUnderTest(CompilerOutput::Discard))
        );
    }

    #[test]
    fn test_only_equivalence_uses_fixture() {
        assert!(Scenario::Equivalence.uses_stdin_fixture());
        assert!(!Scenario::BuildRejection.uses_stdin_fixture());
        assert!(!Scenario::RunRejection.uses_stdin_fixture());
    }

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>(), Ok(scenario));
        }
        assert_eq!("run-rejection".parse::<Scenario>(), Ok(Scenario::RunRejection));
        assert!("smoke".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_infer_from_suite_layout() {
        assert_eq!(
            Scenario::infer_from_path(Path::new("testcases/ShouldFail/RuntimeErrors/Div.java")),
            Scenario::RunRejection
        );
        assert_eq!(
            Scenario::infer_from_path(Path::new("testcases/ShouldFail/TypeErrors/Bad.java")),
            Scenario::BuildRejection
        );
        assert_eq!(
            Scenario::infer_from_path(Path::new("testcases/ShouldFail/ParseErrors")),
            Scenario::BuildRejection
        );
        assert_eq!(
            Scenario::infer_from_path(Path::new("testcases/Medium/HeapSort.java")),
            Scenario::Equivalence
        );
    }
}
