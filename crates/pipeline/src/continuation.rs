//! Explicit run chaining: when a kind with a defined successor completes,
//! the successor is enqueued as a fresh job with default arguments.
//!
//! The successor's outcome is recorded on its own progress record; nothing
//! here can rewrite the completed run's terminal status.

use async_trait::async_trait;
use sqlx::PgPool;

use shapecloud_core::kinds::PipelineKind;
use shapecloud_core::types::DbId;
use shapecloud_db::models::job::{Job, NewJob};
use shapecloud_db::repositories::{JobRepo, TaskProgressRepo};

use crate::error::PipelineError;

/// Where trigger messages go. Implemented by the broker client at the
/// binaries' composition roots.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publish one message (a job id) to the named queue.
    async fn publish(&self, queue: &str, payload: &str) -> Result<(), PipelineError>;
}

/// Enqueue the successor of a completed job, if its kind defines one.
///
/// Failures are logged and swallowed: the completed run already reached
/// its terminal state and must keep it.
pub async fn enqueue_successor(pool: &PgPool, queue: &dyn JobQueue, completed: &Job) {
    let Ok(kind) = completed.kind.parse::<PipelineKind>() else {
        return;
    };
    let Some(successor) = kind.successor() else {
        return;
    };

    match try_enqueue(pool, queue, completed, successor).await {
        Ok(progress_id) => {
            tracing::info!(
                job_id = completed.id,
                successor = %successor,
                progress_id,
                "Successor run enqueued",
            );
        }
        Err(e) => {
            tracing::error!(
                job_id = completed.id,
                successor = %successor,
                error = %e,
                "Failed to enqueue successor run",
            );
        }
    }
}

/// Create the successor job + progress record and publish its id.
async fn try_enqueue(
    pool: &PgPool,
    queue: &dyn JobQueue,
    completed: &Job,
    successor: PipelineKind,
) -> Result<DbId, PipelineError> {
    let job = JobRepo::create(
        pool,
        &NewJob {
            project_id: completed.project_id,
            user_id: completed.user_id,
            kind: successor.as_str().to_string(),
            // Fixed default arguments: the successor runs with an empty
            // parameter map and no extra args.
            parameters: serde_json::json!({}),
            extra_args: Vec::new(),
        },
    )
    .await?;
    let progress = TaskProgressRepo::create(pool, job.id, successor.as_str()).await?;
    queue.publish(successor.queue(), &job.id.to_string()).await?;
    Ok(progress.id)
}
