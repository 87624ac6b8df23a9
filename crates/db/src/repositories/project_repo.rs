//! Repositories for the `projects` and `datasets` tables.

use sqlx::PgPool;

use shapecloud_core::types::DbId;

use crate::models::project::{Dataset, Project};

/// Column list for `projects` queries.
const PROJECT_COLUMNS: &str = "id, dataset_id, name, file_key, created_at, updated_at";

/// Column list for `datasets` queries.
const DATASET_COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides operations on projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Create a project over a dataset.
    pub async fn create(
        pool: &PgPool,
        dataset_id: DbId,
        name: &str,
        file_key: &str,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (dataset_id, name, file_key) \
             VALUES ($1, $2, $3) \
             RETURNING {PROJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(dataset_id)
            .bind(name)
            .bind(file_key)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Point a project at a new definition document in the blob store.
    pub async fn update_file_key(
        pool: &PgPool,
        id: DbId,
        file_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET file_key = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(file_key)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Provides operations on datasets.
pub struct DatasetRepo;

impl DatasetRepo {
    /// Create a dataset.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Dataset, sqlx::Error> {
        let query = format!(
            "INSERT INTO datasets (name) VALUES ($1) RETURNING {DATASET_COLUMNS}"
        );
        sqlx::query_as::<_, Dataset>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Find a dataset by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = $1");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
