//! Integration tests for the task progress record invariants: the
//! percentage never decreases, no write lands after abort, and abort
//! removes the record entirely.

mod common;

use sqlx::PgPool;

use shapecloud_db::repositories::TaskProgressRepo;

// ---------------------------------------------------------------------------
// Test: fresh records start at zero
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn new_record_starts_at_zero(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "groom").await;

    let progress = TaskProgressRepo::create(&pool, job.id, "groom")
        .await
        .unwrap();

    assert_eq!(progress.percentage, 0);
    assert!(progress.message.is_empty());
    assert!(progress.error.is_empty());
    assert!(!progress.abort);
}

// ---------------------------------------------------------------------------
// Test: percentage is non-decreasing and clamped
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn percentage_never_decreases(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "optimize").await;
    let progress = TaskProgressRepo::create(&pool, job.id, "optimize")
        .await
        .unwrap();

    TaskProgressRepo::update_percentage(&pool, progress.id, 50)
        .await
        .unwrap();
    TaskProgressRepo::update_percentage(&pool, progress.id, 30)
        .await
        .unwrap();

    let row = TaskProgressRepo::find_by_id(&pool, progress.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.percentage, 50, "a lower report must not move the value");
}

#[sqlx::test]
async fn percentage_clamped_to_valid_range(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "optimize").await;
    let progress = TaskProgressRepo::create(&pool, job.id, "optimize")
        .await
        .unwrap();

    TaskProgressRepo::update_percentage(&pool, progress.id, 150)
        .await
        .unwrap();

    let row = TaskProgressRepo::find_by_id(&pool, progress.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.percentage, 100);
}

// ---------------------------------------------------------------------------
// Test: abort blocks every later write
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn no_writes_land_after_abort(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "groom").await;
    let progress = TaskProgressRepo::create(&pool, job.id, "groom")
        .await
        .unwrap();

    TaskProgressRepo::update_percentage(&pool, progress.id, 40)
        .await
        .unwrap();
    assert!(TaskProgressRepo::set_abort(&pool, progress.id).await.unwrap());
    assert!(TaskProgressRepo::is_aborted(&pool, progress.id).await.unwrap());

    TaskProgressRepo::update_percentage(&pool, progress.id, 90)
        .await
        .unwrap();
    TaskProgressRepo::update_message(&pool, progress.id, "still going")
        .await
        .unwrap();
    TaskProgressRepo::update_error(&pool, progress.id, "boom")
        .await
        .unwrap();

    let row = TaskProgressRepo::find_by_id(&pool, progress.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.percentage, 40);
    assert!(row.message.is_empty());
    assert!(row.error.is_empty());
}

// ---------------------------------------------------------------------------
// Test: deletion is the abort terminal state
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn deleted_record_reads_as_aborted(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "groom").await;
    let progress = TaskProgressRepo::create(&pool, job.id, "groom")
        .await
        .unwrap();

    TaskProgressRepo::delete(&pool, progress.id).await.unwrap();

    assert!(TaskProgressRepo::find_by_id(&pool, progress.id)
        .await
        .unwrap()
        .is_none());
    assert!(
        TaskProgressRepo::is_aborted(&pool, progress.id).await.unwrap(),
        "a vanished record must read as aborted so the run stops"
    );
}

// ---------------------------------------------------------------------------
// Test: error marks the run terminal
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn error_text_marks_run_failed(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let job = common::seed_job(&pool, &project, "analyze").await;
    let progress = TaskProgressRepo::create(&pool, job.id, "analyze")
        .await
        .unwrap();

    TaskProgressRepo::update_error(&pool, progress.id, "engine wrote to stderr")
        .await
        .unwrap();

    let row = TaskProgressRepo::find_by_id(&pool, progress.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.error, "engine wrote to stderr");
    assert!(row.is_terminal());
}
