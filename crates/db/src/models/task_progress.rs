//! The durable progress record for one asynchronous pipeline run.

use serde::Serialize;
use shapecloud_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `task_progress` table.
///
/// The run is the only writer; status pollers and abort requests read and
/// flag it from other processes. A missing row means the run was aborted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskProgress {
    pub id: DbId,
    pub job_id: DbId,
    pub kind: String,
    pub percentage: i16,
    pub message: String,
    pub error: String,
    pub abort: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskProgress {
    /// A run is finished when it reached 100% or recorded an error.
    pub fn is_terminal(&self) -> bool {
        self.percentage >= 100 || !self.error.is_empty()
    }
}
