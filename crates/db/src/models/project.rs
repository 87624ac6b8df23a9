//! Project and dataset rows.

use serde::Serialize;
use shapecloud_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `projects` table. `file_key` locates the project
/// definition document in the blob store.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub dataset_id: DbId,
    pub name: String,
    pub file_key: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dataset {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
