//! Suite runner (pytest-style)
//!
//! Discovers `*.java` programs under one or more directories and runs each one in its own workspace. The scenario
//! of a case comes from `--scenario`, or else from the directory it lives in:
//!
//! - `.../RuntimeErrors/...` - the program must fail at run time
//! - `.../ParseErrors/...`, `.../TypeErrors/...` - the compiler under test must reject it
//! - anything else - both pipelines must agree
//!
//! ## SuiteReporter Trait
//!
//! Reporting is separated from execution through the `SuiteReporter` trait, with a console reporter and a
//! JSON-lines reporter for machine consumption.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, ValueEnum};
use difftest_core::{Scenario, Verdict};

use super::commands::resolve_toolchain;
use super::{CliError, CliResult, ExitCode, ToolOverrides};
use crate::config::ToolchainConfig;
use crate::controller::run_case;
use crate::driver::{ProcessRunner, ToolRunner};
use crate::workspace::discover_case;

const SOURCE_EXTENSION: &str = "java";

#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Compiler under test
    #[arg(long, value_name = "COMPILER")]
    pub compiler: PathBuf,
    /// Runtime support source linked into every native executable
    #[arg(long, value_name = "RUNTIME")]
    pub runtime: PathBuf,
    /// Run every case under this scenario instead of inferring it from the directory layout
    #[arg(long, value_name = "SCENARIO")]
    pub scenario: Option<Scenario>,
    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,
    /// Only run cases whose name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,
    /// Directories or files to run
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,
    #[command(flatten)]
    pub overrides: ToolOverrides,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Console,
    Json,
}

// ============================================================================
// Suite Reporter Trait
// ============================================================================

/// Trait for reporting suite execution results.
pub trait SuiteReporter {
    /// Called once every case has been collected and filtered
    fn on_collection_complete(&mut self, case_count: usize);

    /// Called before a case runs
    fn on_case_start(&mut self, _case: &SuiteCase) {}

    /// Called when a case has a verdict
    fn on_case_complete(&mut self, result: &CaseResult);

    /// Called when the run is over
    fn on_run_complete(&mut self, summary: &SuiteSummary);
}

/// One program to run, with the scenario it runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteCase {
    pub source: PathBuf,
    pub scenario: Scenario,
}

impl SuiteCase {
    pub fn name(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of one case
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case: SuiteCase,
    pub verdict: Verdict,
    /// Stage summary, or the infrastructure error that stopped the case.
    pub detail: String,
    pub duration: Duration,
}

/// Summary of a suite run
#[derive(Debug, Clone, Default)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl SuiteSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Default console reporter (pytest-style)
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
    failures: Vec<CaseResult>,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            failures: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SuiteReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, case_count: usize) {
        let _ = writeln!(
            self.out,
            "\x1b[1m=================== difftest session starts ===================\x1b[0m"
        );
        let _ = writeln!(self.out, "collected {} case(s)", case_count);
        let _ = writeln!(self.out);
    }

    fn on_case_complete(&mut self, result: &CaseResult) {
        let status = match (result.verdict, self.verbose) {
            (Verdict::Ok, false) => "\x1b[32mPASSED\x1b[0m".to_string(),
            (Verdict::Fail, false) => "\x1b[31mFAILED\x1b[0m".to_string(),
            (Verdict::Ok, true) => format!(
                "\x1b[32mPASSED\x1b[0m ({:.0}ms, {})",
                result.duration.as_millis(),
                result.detail
            ),
            (Verdict::Fail, true) => format!(
                "\x1b[31mFAILED\x1b[0m ({:.0}ms, {})",
                result.duration.as_millis(),
                result.detail
            ),
        };
        let _ = writeln!(
            self.out,
            "{} [{}] {}",
            result.case.source.display(),
            result.case.scenario,
            status
        );

        if !result.verdict.is_ok() {
            self.failures.push(result.clone());
        }
    }

    fn on_run_complete(&mut self, summary: &SuiteSummary) {
        if !self.failures.is_empty() {
            let _ = writeln!(self.out);
            let _ = writeln!(self.out, "\x1b[1;31m=================== FAILURES ===================\x1b[0m");
            for failure in &self.failures {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "\x1b[1m___________ {} ___________\x1b[0m", failure.case.name());
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "    {}: {}", failure.case.scenario, failure.detail);
                let _ = writeln!(self.out, "    {}", failure.case.source.display());
            }
        }

        let _ = writeln!(self.out);
        let color = if summary.all_passed() { "\x1b[1;32m" } else { "\x1b[1;31m" };
        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if parts.is_empty() {
            parts.push("no cases ran".to_string());
        }
        let _ = writeln!(
            self.out,
            "{}=================== {} in {:.2}s ===================\x1b[0m",
            color,
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

/// One JSON object per line: a `collected` event, one `case` event per case, a final `summary`.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) {
        let _ = writeln!(self.out, "{}", value);
    }
}

impl<W: Write> SuiteReporter for JsonReporter<W> {
    fn on_collection_complete(&mut self, case_count: usize) {
        self.emit(serde_json::json!({ "event": "collected", "count": case_count }));
    }

    fn on_case_complete(&mut self, result: &CaseResult) {
        self.emit(serde_json::json!({
            "event": "case",
            "name": result.case.name(),
            "path": result.case.source.display().to_string(),
            "scenario": result.case.scenario.name(),
            "verdict": result.verdict.as_str(),
            "detail": result.detail,
            "duration_ms": result.duration.as_millis() as u64,
        }));
    }

    fn on_run_complete(&mut self, summary: &SuiteSummary) {
        self.emit(serde_json::json!({
            "event": "summary",
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "duration_ms": summary.duration.as_millis() as u64,
        }));
    }
}

// ============================================================================
// Discovery and execution
// ============================================================================

/// Discover `*.java` programs under `path`, sorted. Hidden directories are skipped, and symlinked directories
/// are not descended into, so a link cycle can not make discovery loop.
pub fn discover_sources(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_source(path) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                let entry_path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                    if !name.starts_with('.') {
                        files.extend(discover_sources(&entry_path));
                    }
                } else if is_source(&entry_path) {
                    files.push(entry_path);
                }
            }
        }
    }

    files.sort();
    files
}

fn is_source(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}

/// Turn discovered sources into cases, applying the scenario override and the keyword filter.
pub fn collect_cases(sources: Vec<PathBuf>, scenario: Option<Scenario>, filter: Option<&str>) -> Vec<SuiteCase> {
    sources
        .into_iter()
        .map(|source| {
            let scenario = scenario.unwrap_or_else(|| Scenario::infer_from_path(&source));
            SuiteCase { source, scenario }
        })
        .filter(|case| filter.is_none_or(|keyword| case.name().contains(keyword)))
        .collect()
}

/// Run every case in order, each in its own workspace.
pub fn execute_suite(
    cases: &[SuiteCase],
    config: &ToolchainConfig,
    runner: &dyn ToolRunner,
    reporter: &mut dyn SuiteReporter,
    stop_on_fail: bool,
) -> SuiteSummary {
    let start_time = Instant::now();
    let mut summary = SuiteSummary::default();

    reporter.on_collection_complete(cases.len());

    for case in cases {
        reporter.on_case_start(case);
        let started = Instant::now();

        let outcome = discover_case(&case.source).and_then(|tc| run_case(case.scenario, config, runner, &tc));
        let (verdict, detail) = match outcome {
            Ok(report) => (report.verdict, report.summary()),
            Err(e) => {
                tracing::warn!("{}: {}", case.source.display(), e);
                (Verdict::Fail, e.to_string())
            }
        };

        let result = CaseResult {
            case: case.clone(),
            verdict,
            detail,
            duration: started.elapsed(),
        };

        summary.total += 1;
        if verdict.is_ok() {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
        reporter.on_case_complete(&result);

        if stop_on_fail && !verdict.is_ok() {
            break;
        }
    }

    summary.duration = start_time.elapsed();
    reporter.on_run_complete(&summary);
    summary
}

/// Run the suite described by `args`.
pub fn run_suite(args: &SuiteArgs) -> CliResult<ExitCode> {
    let config = resolve_toolchain(&args.compiler, &args.runtime, &args.overrides)?;

    let sources: Vec<PathBuf> = args.paths.iter().flat_map(|p| discover_sources(p)).collect();
    if sources.is_empty() {
        let searched: Vec<String> = args.paths.iter().map(|p| p.display().to_string()).collect();
        return Err(CliError::failure(format!(
            "No test programs found in '{}'\nTest programs should be named *.{}",
            searched.join("', '"),
            SOURCE_EXTENSION
        )));
    }

    let cases = collect_cases(sources, args.scenario, args.filter.as_deref());
    if cases.is_empty() {
        eprintln!("No cases collected");
        return Ok(ExitCode::SUCCESS);
    }

    let runner = ProcessRunner::new(config.diagnostics_limit);
    let stdout = io::stdout().lock();
    let summary = match args.format {
        ReportFormat::Console => {
            let mut reporter = ConsoleReporter::new(stdout, args.verbose);
            execute_suite(&cases, &config, &runner, &mut reporter, args.stop_on_fail)
        }
        ReportFormat::Json => {
            let mut reporter = JsonReporter::new(stdout);
            execute_suite(&cases, &config, &runner, &mut reporter, args.stop_on_fail)
        }
    };

    if summary.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}
