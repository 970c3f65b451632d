//! Isolated, disposable working directories.
//!
//! A [`Workspace`] owns a fresh temporary directory for exactly one test run. Dropping it deletes the directory
//! and everything the stages wrote into it, whichever way the run ends (verdict, early return, error, panic).

use std::fs;
use std::path::{Path, PathBuf};

use difftest_core::{ArtifactPaths, TestCase, fixture_path_for};
use tempfile::TempDir;

use crate::error::{HarnessError, HarnessResult};

const WORKSPACE_PREFIX: &str = "difftest-";

/// Build a [`TestCase`] from an input path, attaching `<stem>.in` when it exists next to the source.
pub fn discover_case(input: &Path) -> HarnessResult<TestCase> {
    if !input.is_file() {
        return Err(HarnessError::MissingInput {
            path: input.to_path_buf(),
        });
    }

    let fixture = fixture_path_for(input);
    let fixture = fixture.is_file().then_some(fixture);

    TestCase::from_source(input, fixture).ok_or_else(|| HarnessError::InvalidInput {
        path: input.to_path_buf(),
    })
}

/// An exclusively owned temporary directory.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under the system temporary directory (`TMPDIR` on unix).
    pub fn create() -> HarnessResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(HarnessError::WorkspaceCreate)?;
        tracing::info!("created temporary directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a workspace under `root`.
    pub fn create_in(root: &Path) -> HarnessResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(HarnessError::WorkspaceCreate)?;
        tracing::info!("created temporary directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy the source program and its stdin fixture (if any) into the workspace.
    pub fn stage(&self, case: &TestCase) -> HarnessResult<StagedCase> {
        let names = ArtifactPaths::derive(case);
        let located = names.located_in(self.path());

        copy_into(case.source_path(), &located.source)?;
        if let Some(fixture) = case.stdin_fixture() {
            copy_into(fixture, &located.stdin_fixture)?;
        }

        Ok(StagedCase {
            case: case.clone(),
            names,
            located,
            workdir: self.path().to_path_buf(),
        })
    }

    /// Remove the workspace now, reporting failures instead of ignoring them like `Drop` does.
    pub fn close(self) -> HarnessResult<()> {
        let path = self.path().to_path_buf();
        self.dir.close().map_err(|source| HarnessError::WorkspaceRemove {
            path: path.clone(),
            source,
        })?;
        tracing::info!("removed temporary directory {}", path.display());
        Ok(())
    }
}

fn copy_into(from: &Path, to: &Path) -> HarnessResult<()> {
    fs::copy(from, to).map(|_| ()).map_err(|source| HarnessError::Stage {
        path: from.to_path_buf(),
        source,
    })
}

/// A test case whose files have been copied into a workspace.
#[derive(Debug, Clone)]
pub struct StagedCase {
    case: TestCase,
    names: ArtifactPaths,
    located: ArtifactPaths,
    workdir: PathBuf,
}

impl StagedCase {
    pub fn case(&self) -> &TestCase {
        &self.case
    }

    /// Bare artifact names, as passed to tools.
    pub fn names(&self) -> &ArtifactPaths {
        &self.names
    }

    /// Artifact paths inside the workspace.
    pub fn paths(&self) -> &ArtifactPaths {
        &self.located
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn has_stdin_fixture(&self) -> bool {
        self.case.has_stdin_fixture()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_attaches_sibling_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Echo.java");
        fs::write(&src, "class Echo {}").unwrap();

        assert!(!discover_case(&src).unwrap().has_stdin_fixture());

        fs::write(dir.path().join("Echo.in"), "1 2 3\n").unwrap();
        let case = discover_case(&src).unwrap();
        assert_eq!(case.stdin_fixture(), Some(dir.path().join("Echo.in").as_path()));
    }

    #[test]
    fn test_discover_rejects_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_case(&dir.path().join("Nope.java")).unwrap_err();
        assert!(matches!(err, HarnessError::MissingInput { .. }));

        // A directory is not a program either.
        let err = discover_case(dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::MissingInput { .. }));
    }

    #[test]
    fn test_stage_copies_source_and_fixture() {
        let suite = tempfile::tempdir().unwrap();
        let src = suite.path().join("Echo.java");
        fs::write(&src, "class Echo {}").unwrap();
        fs::write(suite.path().join("Echo.in"), "7\n").unwrap();
        let case = discover_case(&src).unwrap();

        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create_in(root.path()).unwrap();
        let staged = ws.stage(&case).unwrap();

        assert_eq!(fs::read_to_string(&staged.paths().source).unwrap(), "class Echo {}");
        assert_eq!(fs::read_to_string(&staged.paths().stdin_fixture).unwrap(), "7\n");
        assert_eq!(staged.workdir(), ws.path());
        assert_eq!(staged.names().source, PathBuf::from("Echo.java"));
    }

    #[test]
    fn test_drop_removes_directory_and_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create_in(root.path()).unwrap();
            fs::write(ws.path().join("Add.s"), "ret").unwrap();
            fs::write(ws.path().join("Add.bin.log"), "3\n").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspaces_are_distinct() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create_in(root.path()).unwrap();
        let b = Workspace::create_in(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
        a.close().unwrap();
        b.close().unwrap();
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
