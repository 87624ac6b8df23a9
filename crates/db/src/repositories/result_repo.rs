//! Repository for the materialized result tables.
//!
//! A pipeline kind's results are generational: the executor deletes the
//! previous generation during staging, so every create here is a pure
//! insert with no merge logic.

use sqlx::PgPool;

use shapecloud_core::kinds::PipelineKind;
use shapecloud_core::types::DbId;

use crate::models::result::{
    Analysis, AnalysisMeanShape, AnalysisMode, GroomedShape, NewParticleSet, ParticleSet,
};

/// Column list for `groomed_shapes` queries.
const GROOMED_COLUMNS: &str = "id, project_id, shape_id, file_key, created_at";

/// Column list for `particle_sets` queries.
const PARTICLE_COLUMNS: &str = "id, project_id, groomed_id, subject_id, anatomy_id, \
     local_file_key, world_file_key, transform, created_at";

/// Provides operations on per-generation result rows.
pub struct ResultRepo;

impl ResultRepo {
    /// Delete every result row of the previous generation for this kind.
    ///
    /// Groom deletion cascades to particle sets built on the deleted
    /// groomed rows; analysis deletion cascades to modes and mean shapes.
    /// DeepSSM kinds materialize no rows, so there is nothing to delete.
    pub async fn delete_generation(
        pool: &PgPool,
        project_id: DbId,
        kind: PipelineKind,
    ) -> Result<u64, sqlx::Error> {
        let table = match kind {
            PipelineKind::Groom => "groomed_shapes",
            PipelineKind::Optimize => "particle_sets",
            PipelineKind::Analyze => "analyses",
            PipelineKind::DeepssmAugment
            | PipelineKind::DeepssmTrain
            | PipelineKind::DeepssmTest => return Ok(0),
        };
        let query = format!("DELETE FROM {table} WHERE project_id = $1");
        let result = sqlx::query(&query).bind(project_id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    // -- groom ---------------------------------------------------------------

    /// Create a groomed shape row backed by its originating input shape.
    pub async fn create_groomed(
        pool: &PgPool,
        project_id: DbId,
        shape_id: DbId,
        file_key: &str,
    ) -> Result<GroomedShape, sqlx::Error> {
        let query = format!(
            "INSERT INTO groomed_shapes (project_id, shape_id, file_key) \
             VALUES ($1, $2, $3) \
             RETURNING {GROOMED_COLUMNS}"
        );
        sqlx::query_as::<_, GroomedShape>(&query)
            .bind(project_id)
            .bind(shape_id)
            .bind(file_key)
            .fetch_one(pool)
            .await
    }

    /// All groomed rows of a project's current generation.
    pub async fn groomed_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<GroomedShape>, sqlx::Error> {
        let query = format!(
            "SELECT {GROOMED_COLUMNS} FROM groomed_shapes WHERE project_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, GroomedShape>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    // -- optimize ------------------------------------------------------------

    /// Create a particle set row.
    pub async fn create_particle_set(
        pool: &PgPool,
        input: &NewParticleSet,
    ) -> Result<ParticleSet, sqlx::Error> {
        let query = format!(
            "INSERT INTO particle_sets \
                 (project_id, groomed_id, subject_id, anatomy_id, \
                  local_file_key, world_file_key, transform) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, ParticleSet>(&query)
            .bind(input.project_id)
            .bind(input.groomed_id)
            .bind(input.subject_id)
            .bind(&input.anatomy_id)
            .bind(&input.local_file_key)
            .bind(&input.world_file_key)
            .bind(&input.transform)
            .fetch_one(pool)
            .await
    }

    /// All particle sets of a project's current generation, in the stable
    /// (subject, anatomy) order positional consumers rely on.
    pub async fn particle_sets_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<ParticleSet>, sqlx::Error> {
        let query = format!(
            "SELECT {PARTICLE_COLUMNS} FROM particle_sets \
             WHERE project_id = $1 \
             ORDER BY subject_id, anatomy_id"
        );
        sqlx::query_as::<_, ParticleSet>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    // -- analyze -------------------------------------------------------------

    /// Create the analysis row for a generation.
    pub async fn create_analysis(
        pool: &PgPool,
        project_id: DbId,
        charts: &serde_json::Value,
    ) -> Result<Analysis, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            "INSERT INTO analyses (project_id, charts) VALUES ($1, $2) \
             RETURNING id, project_id, charts, created_at",
        )
        .bind(project_id)
        .bind(charts)
        .fetch_one(pool)
        .await
    }

    /// Create one mode row of an analysis.
    pub async fn create_analysis_mode(
        pool: &PgPool,
        analysis_id: DbId,
        mode: i32,
        eigen_value: f64,
        explained_variance: f64,
        cumulative_explained_variance: f64,
        pca_values: &serde_json::Value,
    ) -> Result<AnalysisMode, sqlx::Error> {
        sqlx::query_as::<_, AnalysisMode>(
            "INSERT INTO analysis_modes \
                 (analysis_id, mode, eigen_value, explained_variance, \
                  cumulative_explained_variance, pca_values) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, analysis_id, mode, eigen_value, explained_variance, \
                       cumulative_explained_variance, pca_values",
        )
        .bind(analysis_id)
        .bind(mode)
        .bind(eigen_value)
        .bind(explained_variance)
        .bind(cumulative_explained_variance)
        .bind(pca_values)
        .fetch_one(pool)
        .await
    }

    /// Create one mean shape row of an analysis.
    pub async fn create_mean_shape(
        pool: &PgPool,
        analysis_id: DbId,
        file_key: &str,
        particle_set_id: Option<DbId>,
    ) -> Result<AnalysisMeanShape, sqlx::Error> {
        sqlx::query_as::<_, AnalysisMeanShape>(
            "INSERT INTO analysis_mean_shapes (analysis_id, file_key, particle_set_id) \
             VALUES ($1, $2, $3) \
             RETURNING id, analysis_id, file_key, particle_set_id",
        )
        .bind(analysis_id)
        .bind(file_key)
        .bind(particle_set_id)
        .fetch_one(pool)
        .await
    }

    /// All analyses of a project's current generation.
    pub async fn analyses_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Analysis>, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            "SELECT id, project_id, charts, created_at FROM analyses \
             WHERE project_id = $1 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}
