//! Pipeline run request rows.

use serde::Serialize;
use shapecloud_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `jobs` table: one triggered pipeline run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub parameters: serde_json::Value,
    pub extra_args: Vec<String>,
    pub created_at: Timestamp,
}

/// Input for creating a job row.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub project_id: DbId,
    pub user_id: DbId,
    pub kind: String,
    /// String key/value parameter map, stored as JSONB.
    pub parameters: serde_json::Value,
    pub extra_args: Vec<String>,
}
