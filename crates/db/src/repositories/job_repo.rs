//! Repository for the `jobs` table.

use sqlx::PgPool;

use shapecloud_core::types::DbId;

use crate::models::job::{Job, NewJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "id, project_id, user_id, kind, parameters, extra_args, created_at";

/// Provides operations on pipeline run requests.
pub struct JobRepo;

impl JobRepo {
    /// Record a new pipeline request.
    pub async fn create(pool: &PgPool, input: &NewJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (project_id, user_id, kind, parameters, extra_args) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.project_id)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.parameters)
            .bind(&input.extra_args)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
