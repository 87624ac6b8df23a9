//! Handlers for pipeline triggering, progress polling, and abort.
//!
//! Triggering validates the request synchronously against the kind's
//! parameter schema, records the job and its progress record, and
//! publishes the job id to the kind's queue. The run itself happens in a
//! worker process; everything after the 202 is observed through the
//! progress record.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use shapecloud_core::error::CoreError;
use shapecloud_core::kinds::PipelineKind;
use shapecloud_core::params::translate_parameters;
use shapecloud_core::types::DbId;
use shapecloud_db::models::job::NewJob;
use shapecloud_db::repositories::{JobRepo, ProjectRepo, TaskProgressRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /api/v1/projects/{id}/pipelines/{kind}`.
///
/// The request router upstream injects the authenticated user id.
#[derive(Debug, Deserialize, Validate)]
pub struct TriggerRequest {
    pub user_id: DbId,
    /// String key/value parameters, validated against the kind's schema.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Extra engine arguments appended verbatim to the invocation.
    #[serde(default)]
    #[validate(length(max = 16, message = "At most 16 extra arguments"))]
    pub extra_args: Vec<String>,
}

/// Response payload of a successful trigger.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job_id: DbId,
    pub progress_id: DbId,
}

/// POST /api/v1/projects/{id}/pipelines/{kind}
///
/// Start an asynchronous pipeline run. Returns 202 with the progress
/// record id to poll.
pub async fn trigger(
    State(state): State<AppState>,
    Path((project_id, kind)): Path<(DbId, String)>,
    Json(input): Json<TriggerRequest>,
) -> AppResult<impl IntoResponse> {
    let kind: PipelineKind = kind.parse().map_err(AppError::Core)?;

    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Surface bad parameters now, before anything is enqueued. The run
    // re-translates with the project's real domain count during staging.
    translate_parameters(kind, &input.parameters, 1).map_err(AppError::Core)?;

    let project = ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    let job = JobRepo::create(
        &state.pool,
        &NewJob {
            project_id: project.id,
            user_id: input.user_id,
            kind: kind.as_str().to_string(),
            parameters: serde_json::to_value(&input.parameters)
                .unwrap_or_else(|_| serde_json::json!({})),
            extra_args: input.extra_args.clone(),
        },
    )
    .await?;
    let progress = TaskProgressRepo::create(&state.pool, job.id, kind.as_str()).await?;

    state
        .broker
        .publish(kind.queue(), &job.id.to_string())
        .await?;

    tracing::info!(
        job_id = job.id,
        project_id,
        kind = %kind,
        progress_id = progress.id,
        "Pipeline run triggered",
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: TriggerResponse {
                job_id: job.id,
                progress_id: progress.id,
            },
        }),
    ))
}

/// GET /api/v1/progress/{id}
///
/// Poll a run's progress record. 404 once an aborted run's record has
/// been deleted.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(progress_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let progress = TaskProgressRepo::find_by_id(&state.pool, progress_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Progress record",
            id: progress_id,
        }))?;
    Ok(Json(DataResponse { data: progress }))
}

/// POST /api/v1/progress/{id}/abort
///
/// Set the abort flag. The run observes it cooperatively at its next
/// output line, kills the engine, and deletes the record.
pub async fn abort(
    State(state): State<AppState>,
    Path(progress_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let flagged = TaskProgressRepo::set_abort(&state.pool, progress_id).await?;
    if !flagged {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Progress record",
            id: progress_id,
        }));
    }

    tracing::info!(progress_id, "Abort requested");
    Ok(StatusCode::NO_CONTENT)
}
