//! Materialized result rows: groomed shapes, particle sets, and analyses.

use serde::Serialize;
use shapecloud_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `groomed_shapes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroomedShape {
    pub id: DbId,
    pub project_id: DbId,
    pub shape_id: DbId,
    pub file_key: String,
    pub created_at: Timestamp,
}

/// A row from the `particle_sets` table: one optimize output per domain.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParticleSet {
    pub id: DbId,
    pub project_id: DbId,
    pub groomed_id: DbId,
    pub subject_id: DbId,
    pub anatomy_id: String,
    pub local_file_key: Option<String>,
    pub world_file_key: Option<String>,
    /// Alignment matrix serialized as text, when the engine reported one.
    pub transform: Option<String>,
    pub created_at: Timestamp,
}

/// Input for creating a particle set row.
#[derive(Debug, Clone)]
pub struct NewParticleSet {
    pub project_id: DbId,
    pub groomed_id: DbId,
    pub subject_id: DbId,
    pub anatomy_id: String,
    pub local_file_key: Option<String>,
    pub world_file_key: Option<String>,
    pub transform: Option<String>,
}

/// A row from the `analyses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Analysis {
    pub id: DbId,
    pub project_id: DbId,
    pub charts: serde_json::Value,
    pub created_at: Timestamp,
}

/// A row from the `analysis_modes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisMode {
    pub id: DbId,
    pub analysis_id: DbId,
    pub mode: i32,
    pub eigen_value: f64,
    pub explained_variance: f64,
    pub cumulative_explained_variance: f64,
    pub pca_values: serde_json::Value,
}

/// A row from the `analysis_mean_shapes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisMeanShape {
    pub id: DbId,
    pub analysis_id: DbId,
    pub file_key: String,
    pub particle_set_id: Option<DbId>,
}
