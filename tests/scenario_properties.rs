//! Property-based tests for scenario execution
//!
//! A scripted in-memory runner stands in for the toolchain, so these properties exercise the controller,
//! the workspace lifecycle and the comparator without spawning any process.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

use difftest::driver::{Invocation, OutputSink, ProcessOutcome};
use difftest::{
    HarnessResult, Scenario, Stage, StageOutcome, TestCase, ToolRunner, ToolchainConfig, Verdict, run_case_in,
};
use proptest::prelude::*;

/// Answers each stage with the next scripted exit code (0 once the script runs out) and writes
/// `reference` or `native` into the matching capture file.
struct Scripted {
    codes: Vec<i32>,
    next: Cell<usize>,
    reference: Vec<u8>,
    native: Vec<u8>,
    calls: RefCell<Vec<Invocation>>,
}

impl Scripted {
    fn new(codes: Vec<i32>, reference: &[u8], native: &[u8]) -> Self {
        Self {
            codes,
            next: Cell::new(0),
            reference: reference.to_vec(),
            native: native.to_vec(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ToolRunner for Scripted {
    fn run(&self, invocation: &Invocation) -> HarnessResult<ProcessOutcome> {
        if let OutputSink::File(path) = &invocation.stdout {
            let name = path.to_string_lossy();
            let bytes: &[u8] = if name.ends_with(".java.log") {
                &self.reference
            } else if name.ends_with(".bin.log") {
                &self.native
            } else {
                b"\tret\n"
            };
            fs::write(path, bytes).expect("write capture");
        }
        self.calls.borrow_mut().push(invocation.clone());

        let i = self.next.get();
        self.next.set(i + 1);
        let code = self.codes.get(i).copied().unwrap_or(0);
        Ok(ProcessOutcome::new(StageOutcome::from_exit_code(code)))
    }
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    prop_oneof![
        Just(Scenario::Equivalence),
        Just(Scenario::BuildRejection),
        Just(Scenario::RunRejection),
    ]
}

/// Exit codes biased towards success so full pipelines show up often.
fn exit_codes() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(prop_oneof![4 => Just(0), 1 => 1..=3i32], 5)
}

fn write_case(dir: &Path, with_fixture: bool) -> TestCase {
    let source = dir.join("Prop.java");
    fs::write(&source, "class Prop {}").expect("write source");
    let fixture = with_fixture.then(|| {
        let fixture = dir.join("Prop.in");
        fs::write(&fixture, "4 5\n").expect("write fixture");
        fixture
    });
    TestCase::from_source(&source, fixture).expect("valid case")
}

fn config() -> ToolchainConfig {
    ToolchainConfig::new("mjc", "runtime.c")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: no stage runs after the first failing one, and the verdict follows the policy table.
    #[test]
    fn pipeline_stops_at_first_failure(scenario in scenario_strategy(), codes in exit_codes()) {
        let suite = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let case = write_case(suite.path(), false);
        let runner = Scripted::new(codes.clone(), b"same\n", b"same\n");

        let report = run_case_in(root.path(), scenario, &config(), &runner, &case).unwrap();

        let pipeline = scenario.pipeline();
        let first_failure = codes.iter().take(pipeline.len()).position(|&c| c != 0);
        match first_failure {
            Some(index) => {
                prop_assert_eq!(runner.call_count(), index + 1);
                prop_assert_eq!(report.verdict, scenario.verdict_on_failure(pipeline[index]));
                prop_assert_eq!(report.failed_stage().map(|r| r.stage), Some(pipeline[index]));
            }
            None => {
                prop_assert_eq!(runner.call_count(), pipeline.len());
                let expected = Verdict::from_pass(scenario == Scenario::Equivalence);
                prop_assert_eq!(report.verdict, expected);
            }
        }
    }

    /// Property: BuildRejection is OK exactly when a build stage fails.
    #[test]
    fn build_rejection_ok_iff_build_fails(codes in exit_codes()) {
        let suite = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let case = write_case(suite.path(), false);
        let runner = Scripted::new(codes.clone(), b"", b"");

        let report = run_case_in(root.path(), Scenario::BuildRejection, &config(), &runner, &case).unwrap();

        let build_failed = codes.iter().take(2).any(|&c| c != 0);
        prop_assert_eq!(report.verdict.is_ok(), build_failed);
        for record in &report.trace {
            prop_assert!(record.stage.is_build_stage());
        }
    }

    /// Property: RunRejection is OK exactly when the build succeeds and the executable fails.
    #[test]
    fn run_rejection_ok_iff_native_run_fails(codes in exit_codes()) {
        let suite = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let case = write_case(suite.path(), false);
        let runner = Scripted::new(codes.clone(), b"", b"");

        let report = run_case_in(root.path(), Scenario::RunRejection, &config(), &runner, &case).unwrap();

        let expected = codes[0] == 0 && codes[1] == 0 && codes[2] != 0;
        prop_assert_eq!(report.verdict.is_ok(), expected);
        if report.verdict.is_ok() {
            prop_assert!(matches!(report.failed_stage().map(|r| r.stage), Some(Stage::NativeRun(_))));
        }
    }

    /// Property: when every stage succeeds, Equivalence is OK exactly when the logs are byte-identical.
    #[test]
    fn equivalence_ok_iff_logs_identical(
        reference in prop::collection::vec(any::<u8>(), 0..64),
        native in prop::collection::vec(any::<u8>(), 0..64),
        with_fixture in any::<bool>(),
    ) {
        let suite = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let case = write_case(suite.path(), with_fixture);
        let runner = Scripted::new(vec![0; 5], &reference, &native);

        let report = run_case_in(root.path(), Scenario::Equivalence, &config(), &runner, &case).unwrap();
        prop_assert_eq!(report.verdict.is_ok(), reference == native);

        // Both runs read the same stdin.
        let calls = runner.calls.borrow();
        prop_assert_eq!(&calls[1].stdin, &calls[4].stdin);
    }

    /// Property: repeated runs of the same case give the same verdict and leave nothing behind.
    #[test]
    fn runs_are_idempotent(scenario in scenario_strategy(), codes in exit_codes(), differ in any::<bool>()) {
        let suite = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let case = write_case(suite.path(), true);
        let native: &[u8] = if differ { b"4\n" } else { b"9\n" };

        let first = run_case_in(root.path(), scenario, &config(), &Scripted::new(codes.clone(), b"9\n", native), &case)
            .unwrap();
        let second = run_case_in(root.path(), scenario, &config(), &Scripted::new(codes, b"9\n", native), &case)
            .unwrap();

        prop_assert_eq!(first.verdict, second.verdict);
        prop_assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
