//! Map scenario stages to concrete invocations.
//!
//! Pure: nothing here touches the filesystem. Tool arguments use bare artifact names (tools run inside the
//! workspace); redirection targets are absolute because the harness opens them itself.

use std::path::Path;

use difftest_core::{ArtifactPaths, CompilerOutput, RunMode, Stage};

use super::{InputSource, Invocation, OutputSink};
use crate::config::{ToolCommand, ToolchainConfig};

/// Build the invocation for `stage`.
///
/// ## Parameters
/// - `names`: artifact names from [`ArtifactPaths::derive`] (not rebased).
/// - `workdir`: the workspace directory.
/// - `with_fixture`: whether a stdin fixture was staged as `names.stdin_fixture`.
pub fn plan_stage(
    stage: Stage,
    config: &ToolchainConfig,
    names: &ArtifactPaths,
    workdir: &Path,
    with_fixture: bool,
) -> Invocation {
    let fixture = || {
        if with_fixture {
            InputSource::File(workdir.join(&names.stdin_fixture))
        } else {
            InputSource::Null
        }
    };

    let invocation = match stage {
        Stage::ReferenceCompile => tool(&config.reference_compiler, workdir).arg(&names.source),
        Stage::ReferenceRun => tool(&config.reference_runtime, workdir)
            .arg(names.reference_entry_point())
            .stdin(fixture())
            .stdout(OutputSink::File(workdir.join(&names.reference_log))),
        Stage::CompileUnderTest(output) => {
            let compile = Invocation::new(&config.compiler, workdir).arg(&names.source);
            match output {
                CompilerOutput::Discard => compile,
                CompilerOutput::AsAssembly => compile.stdout(OutputSink::File(workdir.join(&names.assembly))),
            }
        }
        Stage::AssembleLink => tool(&config.assembler, workdir)
            .arg(&names.assembly)
            .arg(&config.runtime_support)
            .arg("-o")
            .arg(&names.executable),
        Stage::NativeRun(RunMode::Captured) => Invocation::new(workdir.join(&names.executable), workdir)
            .stdin(fixture())
            .stdout(OutputSink::File(workdir.join(&names.native_log))),
        Stage::NativeRun(RunMode::Bare) => Invocation::new(workdir.join(&names.executable), workdir),
    };

    invocation.timeout(config.stage_timeout)
}

fn tool(command: &ToolCommand, workdir: &Path) -> Invocation {
    Invocation::new(&command.program, workdir).args(&command.args)
}
