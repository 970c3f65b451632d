//! Toolchain configuration.
//!
//! The two paths every test needs (compiler under test, runtime support source) come from the command line. The
//! remaining tools default to the classic setup (`javac`, `java`, `gcc -m32`) and can be overridden per run.

use std::path::PathBuf;
use std::time::Duration;

/// Default cap on the diagnostic bytes kept from a single tool invocation.
pub const DEFAULT_DIAGNOSTICS_LIMIT: usize = 64 * 1024;

/// An external program plus the arguments that always precede the harness-supplied ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a whitespace-separated command line such as `"gcc -m32"`.
    ///
    /// No quoting rules: programs or arguments containing spaces need [`ToolCommand::new`] instead.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }
}

/// Everything the driver needs to know about the tools of one run.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// The compiler under test.
    pub compiler: PathBuf,
    /// Runtime support source linked into every native executable.
    pub runtime_support: PathBuf,
    pub reference_compiler: ToolCommand,
    pub reference_runtime: ToolCommand,
    pub assembler: ToolCommand,
    /// Per-stage wall-clock limit; `None` waits forever.
    pub stage_timeout: Option<Duration>,
    /// Bytes of stderr retained per invocation for debug logging.
    pub diagnostics_limit: usize,
}

impl ToolchainConfig {
    pub fn new(compiler: impl Into<PathBuf>, runtime_support: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            runtime_support: runtime_support.into(),
            reference_compiler: ToolCommand::new("javac"),
            reference_runtime: ToolCommand::new("java"),
            assembler: ToolCommand::new("gcc").with_args(["-m32"]),
            stage_timeout: None,
            diagnostics_limit: DEFAULT_DIAGNOSTICS_LIMIT,
        }
    }

    pub fn with_reference_compiler(mut self, tool: ToolCommand) -> Self {
        self.reference_compiler = tool;
        self
    }

    pub fn with_reference_runtime(mut self, tool: ToolCommand) -> Self {
        self.reference_runtime = tool;
        self
    }

    pub fn with_assembler(mut self, tool: ToolCommand) -> Self {
        self.assembler = tool;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }
}
