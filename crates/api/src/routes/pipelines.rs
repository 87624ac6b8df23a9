//! Route definitions for pipeline runs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::pipelines;
use crate::state::AppState;

/// Pipeline routes.
///
/// ```text
/// POST   /projects/{id}/pipelines/{kind}  -> trigger
/// GET    /progress/{id}                   -> get_progress
/// POST   /progress/{id}/abort             -> abort
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{id}/pipelines/{kind}",
            post(pipelines::trigger),
        )
        .route("/progress/{id}", get(pipelines::get_progress))
        .route("/progress/{id}/abort", post(pipelines::abort))
}
