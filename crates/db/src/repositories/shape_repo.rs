//! Repository for the `subjects` and `shapes` tables.

use sqlx::PgPool;

use shapecloud_core::types::DbId;

use crate::models::shape::{Shape, Subject};

/// Column list for `shapes` queries.
const SHAPE_COLUMNS: &str = "id, subject_id, anatomy_id, kind, file_key, created_at";

/// Column list for `subjects` queries.
const SUBJECT_COLUMNS: &str = "id, dataset_id, name, created_at";

/// Provides operations on subjects and their raw input shapes.
pub struct ShapeRepo;

impl ShapeRepo {
    /// Create a subject in a dataset.
    pub async fn create_subject(
        pool: &PgPool,
        dataset_id: DbId,
        name: &str,
    ) -> Result<Subject, sqlx::Error> {
        let query = format!(
            "INSERT INTO subjects (dataset_id, name) VALUES ($1, $2) \
             RETURNING {SUBJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Subject>(&query)
            .bind(dataset_id)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Create a raw input shape for a subject.
    pub async fn create_shape(
        pool: &PgPool,
        subject_id: DbId,
        anatomy_id: &str,
        kind: &str,
        file_key: &str,
    ) -> Result<Shape, sqlx::Error> {
        let query = format!(
            "INSERT INTO shapes (subject_id, anatomy_id, kind, file_key) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SHAPE_COLUMNS}"
        );
        sqlx::query_as::<_, Shape>(&query)
            .bind(subject_id)
            .bind(anatomy_id)
            .bind(kind)
            .bind(file_key)
            .fetch_one(pool)
            .await
    }

    /// All input shapes referenced by a project's dataset, ordered by
    /// subject then anatomy so positional consumers see a stable order.
    pub async fn shapes_for_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Shape>, sqlx::Error> {
        sqlx::query_as::<_, Shape>(
            "SELECT s.id, s.subject_id, s.anatomy_id, s.kind, s.file_key, s.created_at \
             FROM shapes s \
             JOIN subjects subj ON subj.id = s.subject_id \
             JOIN projects p ON p.dataset_id = subj.dataset_id \
             WHERE p.id = $1 \
             ORDER BY s.subject_id, s.anatomy_id",
        )
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Find a subject by its ID.
    pub async fn find_subject(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Subject>, sqlx::Error> {
        let query = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1");
        sqlx::query_as::<_, Subject>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
