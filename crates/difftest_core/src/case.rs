//! Test units and the artifact naming scheme.
//!
//! Every file a scenario reads or writes is named after the source file stem:
//!
//! | Artifact | Name |
//! |---|---|
//! | staged source | `<base>.<ext>` (file name of the input, unchanged) |
//! | stdin fixture | `<base>.in` |
//! | assembly from the compiler under test | `<base>.s` |
//! | native executable | `<base>.bin` |
//! | captured reference output | `<base>.java.log` |
//! | captured native output | `<base>.bin.log` |
//!
//! The names are fixed: log comparison and the compiler under test both depend on them.

use std::path::{Path, PathBuf};

/// Extension of the optional stdin fixture next to a source file.
pub const FIXTURE_EXTENSION: &str = "in";
/// Extension of the assembly emitted by the compiler under test.
pub const ASSEMBLY_EXTENSION: &str = "s";
/// Extension of the linked native executable.
pub const EXECUTABLE_EXTENSION: &str = "bin";
/// Suffix of the log captured from the reference run.
pub const REFERENCE_LOG_SUFFIX: &str = ".java.log";
/// Suffix of the log captured from the native run.
pub const NATIVE_LOG_SUFFIX: &str = ".bin.log";

/// One test unit: a source program and its optional stdin fixture.
///
/// Immutable once constructed. Paths point at the *original* location of the files; staging them into a
/// workspace is the harness' job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    base_name: String,
    source_path: PathBuf,
    stdin_fixture: Option<PathBuf>,
}

impl TestCase {
    /// Build a test case from a source path and an already-resolved fixture.
    ///
    /// ## Returns
    /// - `None` if the source path has no usable UTF-8 file stem (e.g. `/`, `..`).
    pub fn from_source(source_path: impl Into<PathBuf>, stdin_fixture: Option<PathBuf>) -> Option<Self> {
        let source_path = source_path.into();
        let base_name = source_path.file_stem()?.to_str()?.to_string();
        if base_name.is_empty() {
            return None;
        }
        Some(Self {
            base_name,
            source_path,
            stdin_fixture,
        })
    }

    /// Source file name without its extension (`Add` for `tests/Add.java`).
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn stdin_fixture(&self) -> Option<&Path> {
        self.stdin_fixture.as_deref()
    }

    pub fn has_stdin_fixture(&self) -> bool {
        self.stdin_fixture.is_some()
    }
}

/// Path where the stdin fixture of `source` would live: same directory, same stem, `.in` extension.
pub fn fixture_path_for(source: &Path) -> PathBuf {
    source.with_extension(FIXTURE_EXTENSION)
}

/// Deterministic artifact names derived from a [`TestCase`].
///
/// [`ArtifactPaths::derive`] produces bare file names, suitable as arguments for tools running with the workspace
/// as their working directory. [`ArtifactPaths::located_in`] rebases them onto a directory for the harness' own
/// file operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub base_name: String,
    pub source: PathBuf,
    pub stdin_fixture: PathBuf,
    pub assembly: PathBuf,
    pub executable: PathBuf,
    pub reference_log: PathBuf,
    pub native_log: PathBuf,
}

impl ArtifactPaths {
    /// Derive the artifact names for `case`.
    pub fn derive(case: &TestCase) -> Self {
        let base = case.base_name();
        let source = case
            .source_path()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(base));

        Self {
            base_name: base.to_string(),
            source,
            stdin_fixture: PathBuf::from(format!("{base}.{FIXTURE_EXTENSION}")),
            assembly: PathBuf::from(format!("{base}.{ASSEMBLY_EXTENSION}")),
            executable: PathBuf::from(format!("{base}.{EXECUTABLE_EXTENSION}")),
            reference_log: PathBuf::from(format!("{base}{REFERENCE_LOG_SUFFIX}")),
            native_log: PathBuf::from(format!("{base}{NATIVE_LOG_SUFFIX}")),
        }
    }

    /// Rebase every artifact onto `dir`.
    pub fn located_in(&self, dir: &Path) -> Self {
        Self {
            base_name: self.base_name.clone(),
            source: dir.join(&self.source),
            stdin_fixture: dir.join(&self.stdin_fixture),
            assembly: dir.join(&self.assembly),
            executable: dir.join(&self.executable),
            reference_log: dir.join(&self.reference_log),
            native_log: dir.join(&self.native_log),
        }
    }

    /// Name the reference runtime expects: the class name, i.e. the bare base name.
    pub fn reference_entry_point(&self) -> &str {
        &self.base_name
    }
}
