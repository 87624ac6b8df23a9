//! Deterministic construction of the engine command line.

use std::path::{Path, PathBuf};

use shapecloud_core::kinds::PipelineKind;

/// Engine binary used when `ENGINE_BIN` is not set.
pub const DEFAULT_ENGINE_BIN: &str = "shapeworks";

/// File the analyze kind writes its JSON result manifest to, relative to
/// the run workspace.
pub const ANALYZE_MANIFEST_FILENAME: &str = "analysis.json";

/// A fully specified engine child process: working directory, binary, and
/// argument list. Derived from a pipeline request, never mutated after.
#[derive(Debug, Clone)]
pub struct EngineInvocation {
    pub working_dir: PathBuf,
    pub binary: PathBuf,
    pub args: Vec<String>,
}

impl EngineInvocation {
    /// Build the invocation for one run.
    ///
    /// The command line is
    /// `<engine> <kind> --name=<project-file> [--xmlconsole | --output=<manifest>] [extra args]`:
    /// analyze writes a separate manifest, every other kind reports
    /// progress over xmlconsole and rewrites the project file in place.
    pub fn for_kind(
        kind: PipelineKind,
        working_dir: &Path,
        binary: &Path,
        project_filename: &str,
        extra_args: &[String],
    ) -> Self {
        let mut args = vec![
            kind.engine_subcommand().to_string(),
            format!("--name={project_filename}"),
        ];
        if kind.writes_manifest() {
            args.push(format!("--output={ANALYZE_MANIFEST_FILENAME}"));
        } else {
            args.push("--xmlconsole".to_string());
        }
        args.extend(extra_args.iter().cloned());

        Self {
            working_dir: working_dir.to_path_buf(),
            binary: binary.to_path_buf(),
            args,
        }
    }

    /// Path of the manifest this invocation produces, if the kind writes
    /// one.
    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.args
            .iter()
            .any(|a| a.starts_with("--output="))
            .then(|| self.working_dir.join(ANALYZE_MANIFEST_FILENAME))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
