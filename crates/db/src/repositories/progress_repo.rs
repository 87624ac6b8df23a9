//! Repository for the `task_progress` table.
//!
//! Every write is a single statement so updates are immediately visible to
//! readers in other processes. Two invariants live in the SQL itself:
//! the percentage never decreases (`GREATEST`), and no update lands once
//! the abort flag is set (`AND NOT abort`).

use sqlx::PgPool;

use shapecloud_core::types::DbId;

use crate::models::task_progress::TaskProgress;

/// Column list for `task_progress` queries.
const COLUMNS: &str =
    "id, job_id, kind, percentage, message, error, abort, created_at, updated_at";

/// Provides operations on durable run progress records.
pub struct TaskProgressRepo;

impl TaskProgressRepo {
    /// Create a fresh record at 0% for a job.
    pub async fn create(
        pool: &PgPool,
        job_id: DbId,
        kind: &str,
    ) -> Result<TaskProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO task_progress (job_id, kind) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskProgress>(&query)
            .bind(job_id)
            .bind(kind)
            .fetch_one(pool)
            .await
    }

    /// Find a record by its ID. `None` after an abort deletion.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TaskProgress>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_progress WHERE id = $1");
        sqlx::query_as::<_, TaskProgress>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the record belonging to a job.
    pub async fn find_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Option<TaskProgress>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_progress WHERE job_id = $1");
        sqlx::query_as::<_, TaskProgress>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist a new percentage, clamped to [0, 100].
    ///
    /// `GREATEST` keeps the stored value non-decreasing even if the engine
    /// reports a lower number; nothing is written once abort is set.
    pub async fn update_percentage(
        pool: &PgPool,
        id: DbId,
        percentage: i16,
    ) -> Result<(), sqlx::Error> {
        let clamped = percentage.clamp(0, 100);
        sqlx::query(
            "UPDATE task_progress \
             SET percentage = GREATEST(percentage, $2), updated_at = NOW() \
             WHERE id = $1 AND NOT abort",
        )
        .bind(id)
        .bind(clamped)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace the human-readable status message.
    pub async fn update_message(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE task_progress SET message = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT abort",
        )
        .bind(id)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a fatal error, marking the run failed.
    pub async fn update_error(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE task_progress SET error = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT abort",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Set the abort flag. Returns `false` if the record no longer exists.
    pub async fn set_abort(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE task_progress SET abort = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Re-read the abort flag. A deleted record also reads as aborted so a
    /// run whose record vanished stops writing.
    pub async fn is_aborted(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let abort: Option<bool> =
            sqlx::query_scalar("SELECT abort FROM task_progress WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(abort.unwrap_or(true))
    }

    /// Delete the record (abort terminal state).
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_progress WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
