//! Run staging: isolated workspace, input download, previous-generation
//! deletion, and parameter merge.

use std::collections::BTreeMap;
use std::path::Path;

use sqlx::PgPool;
use tempfile::TempDir;

use shapecloud_core::kinds::PipelineKind;
use shapecloud_core::params;
use shapecloud_core::project::ProjectDefinition;
use shapecloud_core::results;
use shapecloud_db::models::job::Job;
use shapecloud_db::models::project::Project;
use shapecloud_db::repositories::ResultRepo;

use crate::error::PipelineError;
use crate::storage::BlobStore;

/// Row prefixes whose values name files that must be present in the
/// workspace before the engine starts. `alignment` and `procrustes` carry
/// inline values, not paths.
const STAGED_FILE_PREFIXES: &[&str] = &[
    "shape",
    "groomed",
    "local_particles",
    "world_particles",
    "image",
    "constraints",
    "landmarks_file",
];

/// A staged run: workspace populated, previous generation gone, project
/// definition mutated and written back to disk.
pub struct StagedRun {
    /// Scoped workspace; removed when the run ends, on every path.
    pub workspace: TempDir,
    pub definition: ProjectDefinition,
    /// File name of the definition inside the workspace.
    pub project_filename: String,
}

impl StagedRun {
    pub fn project_path(&self) -> std::path::PathBuf {
        self.workspace.path().join(&self.project_filename)
    }
}

/// Blob key prefix shared by a project's files: the directory part of the
/// definition's own key.
pub fn project_prefix(file_key: &str) -> &str {
    file_key.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join a workspace-relative path onto a project's blob prefix.
pub fn blob_key(prefix: &str, relative: &str) -> String {
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Stage one run into a fresh workspace.
///
/// Order matters: inputs are fetched first, then the previous generation
/// of this kind's results is deleted *before* anything new is written, so
/// stale and fresh rows can never coexist, and only then are the request
/// parameters merged into the definition.
pub async fn stage_run(
    pool: &PgPool,
    store: &dyn BlobStore,
    job: &Job,
    kind: PipelineKind,
    project: &Project,
) -> Result<StagedRun, PipelineError> {
    let workspace = tempfile::tempdir()
        .map_err(|e| PipelineError::Infrastructure(format!("workspace creation failed: {e}")))?;

    let project_filename = results::trailing_filename(&project.file_key).to_string();
    let project_path = workspace.path().join(&project_filename);
    store.download(&project.file_key, &project_path).await?;

    let bytes = tokio::fs::read(&project_path).await?;
    let mut definition = ProjectDefinition::parse(&bytes)?;

    fetch_referenced_inputs(store, &definition, project, workspace.path()).await;

    ResultRepo::delete_generation(pool, project.id, kind).await?;

    let request_params = parameter_map(&job.parameters)?;
    let translated =
        params::translate_parameters(kind, &request_params, definition.domain_count())?;
    definition.merge_section(kind.project_section(), &translated);
    tokio::fs::write(&project_path, definition.to_bytes()).await?;

    Ok(StagedRun {
        workspace,
        definition,
        project_filename,
    })
}

/// Download every file the definition's data rows reference.
///
/// Missing blobs are logged and skipped rather than failing the run: rows
/// may reference outputs of earlier generations that no longer exist, and
/// the engine gives a better error for anything it actually needs.
async fn fetch_referenced_inputs(
    store: &dyn BlobStore,
    definition: &ProjectDefinition,
    project: &Project,
    workspace: &Path,
) {
    let prefix = project_prefix(&project.file_key);
    for row in definition.data_rows() {
        for (suffix_key, value) in &row {
            let Some((row_prefix, _)) = results::split_key(suffix_key) else {
                continue;
            };
            if !STAGED_FILE_PREFIXES.contains(&row_prefix) {
                continue;
            }
            let key = blob_key(prefix, value);
            let dest = workspace.join(value);
            if let Err(e) = store.download(&key, &dest).await {
                tracing::warn!(key = %key, error = %e, "Referenced input not staged");
            }
        }
    }
}

/// Interpret a job's JSONB parameters as the string map the translation
/// tables expect.
fn parameter_map(parameters: &serde_json::Value) -> Result<BTreeMap<String, String>, PipelineError> {
    let Some(object) = parameters.as_object() else {
        return Err(PipelineError::Validation(
            "Job parameters must be a JSON object".to_string(),
        ));
    };
    object
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Ok((k.clone(), s.clone())),
            serde_json::Value::Number(n) => Ok((k.clone(), n.to_string())),
            serde_json::Value::Bool(b) => Ok((k.clone(), b.to_string())),
            _ => Err(PipelineError::Validation(format!(
                "Parameter \"{k}\" must be a scalar"
            ))),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
