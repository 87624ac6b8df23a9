//! The run state machine: STAGING -> RUNNING -> {COMPLETED, FAILED,
//! ABORTED}.
//!
//! The durable progress record is the only state shared with the rest of
//! the system. The abort flag is re-read from it after every engine output
//! line; setting it kills the child and deletes the record. The workspace
//! and the child process are scoped to this function and released on every
//! exit path.

use std::path::Path;

use sqlx::PgPool;

use shapecloud_core::kinds::PipelineKind;
use shapecloud_core::progress::{
    parse_progress_token, scale_engine_percent, COMPLETE_PERCENT, MATERIALIZE_PERCENT,
    STAGING_PERCENT,
};
use shapecloud_core::project::ProjectDefinition;
use shapecloud_core::types::DbId;
use shapecloud_db::models::job::Job;
use shapecloud_db::repositories::{JobRepo, ProjectRepo, TaskProgressRepo};
use shapecloud_engine::{AnalysisManifest, EngineInvocation, EngineProcess};

use crate::continuation::{self, JobQueue};
use crate::error::PipelineError;
use crate::materialize;
use crate::staging;
use crate::storage::BlobStore;

/// Terminal state of one pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    Aborted,
}

/// Execute the pipeline run for `job_id` to a terminal state.
///
/// Never returns an error: every failure is recorded on the run's progress
/// record (or logged, if even that is impossible) so one bad run can never
/// take the worker loop down with it.
pub async fn run_pipeline(
    pool: &PgPool,
    store: &dyn BlobStore,
    queue: &dyn JobQueue,
    engine_bin: &Path,
    job_id: DbId,
) -> RunOutcome {
    let job = match JobRepo::find_by_id(pool, job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            tracing::error!(job_id, "Job vanished before its run started");
            return RunOutcome::Failed("job not found".to_string());
        }
        Err(e) => {
            tracing::error!(job_id, error = %e, "Failed to load job");
            return RunOutcome::Failed(e.to_string());
        }
    };

    let progress = match TaskProgressRepo::find_by_job(pool, job_id).await {
        Ok(Some(progress)) => progress,
        // No record means the run was aborted before it started.
        Ok(None) => return RunOutcome::Aborted,
        Err(e) => {
            tracing::error!(job_id, error = %e, "Failed to load progress record");
            return RunOutcome::Failed(e.to_string());
        }
    };

    match try_run(pool, store, engine_bin, &job, progress.id).await {
        Ok(()) => {
            let _ = TaskProgressRepo::update_message(pool, progress.id, "Completed").await;
            let _ = TaskProgressRepo::update_percentage(pool, progress.id, COMPLETE_PERCENT).await;
            tracing::info!(job_id, kind = %job.kind, "Pipeline run completed");
            continuation::enqueue_successor(pool, queue, &job).await;
            RunOutcome::Completed
        }
        Err(PipelineError::Aborted) => {
            if let Err(e) = TaskProgressRepo::delete(pool, progress.id).await {
                tracing::error!(job_id, error = %e, "Failed to delete aborted progress record");
            }
            tracing::info!(job_id, kind = %job.kind, "Pipeline run aborted");
            RunOutcome::Aborted
        }
        Err(e) => {
            // Engine errors carry the engine's own words; everything else
            // records its display form.
            let message = match &e {
                PipelineError::Engine(text) => text.clone(),
                other => other.to_string(),
            };
            if let Err(write_err) =
                TaskProgressRepo::update_error(pool, progress.id, &message).await
            {
                tracing::error!(job_id, error = %write_err, "Failed to record run error");
            }
            tracing::error!(job_id, kind = %job.kind, error = %message, "Pipeline run failed");
            RunOutcome::Failed(message)
        }
    }
}

/// The fallible body of a run; the caller maps its result onto the
/// progress record.
async fn try_run(
    pool: &PgPool,
    store: &dyn BlobStore,
    engine_bin: &Path,
    job: &Job,
    progress_id: DbId,
) -> Result<(), PipelineError> {
    let kind: PipelineKind = job.kind.parse()?;
    let project = ProjectRepo::find_by_id(pool, job.project_id)
        .await?
        .ok_or_else(|| {
            PipelineError::Validation(format!("Project {} not found", job.project_id))
        })?;

    // -- STAGING --
    if TaskProgressRepo::is_aborted(pool, progress_id).await? {
        return Err(PipelineError::Aborted);
    }
    TaskProgressRepo::update_message(pool, progress_id, "Staging inputs").await?;
    let staged = staging::stage_run(pool, store, job, kind, &project).await?;
    TaskProgressRepo::update_percentage(pool, progress_id, STAGING_PERCENT).await?;

    if TaskProgressRepo::is_aborted(pool, progress_id).await? {
        return Err(PipelineError::Aborted);
    }

    // -- RUNNING --
    let invocation = EngineInvocation::for_kind(
        kind,
        staged.workspace.path(),
        engine_bin,
        &staged.project_filename,
        &job.extra_args,
    );
    let mut process = EngineProcess::spawn(&invocation)?;
    TaskProgressRepo::update_message(pool, progress_id, "Running engine").await?;

    loop {
        match process.next_line().await {
            Ok(Some(line)) => {
                if let Some(token) = parse_progress_token(&line) {
                    TaskProgressRepo::update_percentage(
                        pool,
                        progress_id,
                        scale_engine_percent(token),
                    )
                    .await?;
                }
                // Cancellation is cooperative: observed at line boundaries.
                if TaskProgressRepo::is_aborted(pool, progress_id).await? {
                    process.kill().await;
                    return Err(PipelineError::Aborted);
                }
            }
            Ok(None) => break,
            Err(e) => {
                process.kill().await;
                return Err(e.into());
            }
        }
    }
    process.finish().await?;

    // -- COMPLETED: materialize --
    TaskProgressRepo::update_percentage(pool, progress_id, MATERIALIZE_PERCENT).await?;
    TaskProgressRepo::update_message(pool, progress_id, "Materializing results").await?;

    if kind.writes_manifest() {
        let manifest_path = invocation.manifest_path().ok_or_else(|| {
            PipelineError::Infrastructure("manifest kind without a manifest path".to_string())
        })?;
        let manifest = AnalysisManifest::load(&manifest_path).await?;
        materialize::materialize_analyze(pool, store, &project, &manifest, staged.workspace.path())
            .await?;
    } else {
        // The engine rewrote the definition in place; re-read it.
        let bytes = tokio::fs::read(staged.project_path()).await?;
        let definition = ProjectDefinition::parse(&bytes).map_err(|e| {
            PipelineError::Engine(format!("Engine left an unreadable project definition: {e}"))
        })?;

        match kind {
            PipelineKind::Groom => {
                let created = materialize::materialize_groom(
                    pool,
                    store,
                    &project,
                    &definition,
                    staged.workspace.path(),
                )
                .await?;
                tracing::info!(job_id = job.id, created, "Groomed rows materialized");
            }
            PipelineKind::Optimize => {
                let created = materialize::materialize_optimize(
                    pool,
                    store,
                    &project,
                    &definition,
                    staged.workspace.path(),
                )
                .await?;
                tracing::info!(job_id = job.id, created, "Particle sets materialized");
            }
            // DeepSSM kinds materialize nothing beyond the definition
            // itself.
            _ => {}
        }

        store.upload(&staged.project_path(), &project.file_key).await?;
        ProjectRepo::update_file_key(pool, project.id, &project.file_key).await?;
    }

    Ok(())
}
