//! Subject and raw input shape rows.

use serde::Serialize;
use shapecloud_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Backing data kind of a shape.
pub const SHAPE_KIND_SEGMENTATION: &str = "segmentation";
pub const SHAPE_KIND_MESH: &str = "mesh";

/// A row from the `subjects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subject {
    pub id: DbId,
    pub dataset_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// A row from the `shapes` table: one raw per-domain input file.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Shape {
    pub id: DbId,
    pub subject_id: DbId,
    pub anatomy_id: String,
    pub kind: String,
    pub file_key: String,
    pub created_at: Timestamp,
}
