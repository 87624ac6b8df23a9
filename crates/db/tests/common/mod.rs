//! Shared seed helpers for repository integration tests.

use sqlx::PgPool;

use shapecloud_db::models::job::{Job, NewJob};
use shapecloud_db::models::project::Project;
use shapecloud_db::models::shape::{Shape, Subject, SHAPE_KIND_SEGMENTATION};
use shapecloud_db::repositories::{DatasetRepo, JobRepo, ProjectRepo, ShapeRepo};

/// Create a dataset with one project and no subjects.
pub async fn seed_project(pool: &PgPool) -> Project {
    let dataset = DatasetRepo::create(pool, "femur-scans")
        .await
        .expect("create dataset");
    ProjectRepo::create(pool, dataset.id, "femur-study", "projects/femur-study.json")
        .await
        .expect("create project")
}

/// Create a subject with one segmentation shape per anatomy id.
pub async fn seed_subject_with_shapes(
    pool: &PgPool,
    project: &Project,
    name: &str,
    anatomies: &[&str],
) -> (Subject, Vec<Shape>) {
    let subject = ShapeRepo::create_subject(pool, project.dataset_id, name)
        .await
        .expect("create subject");

    let mut shapes = Vec::new();
    for anatomy in anatomies {
        let shape = ShapeRepo::create_shape(
            pool,
            subject.id,
            anatomy,
            SHAPE_KIND_SEGMENTATION,
            &format!("shapes/{name}-{anatomy}.nrrd"),
        )
        .await
        .expect("create shape");
        shapes.push(shape);
    }
    (subject, shapes)
}

/// Create a job row for a project.
pub async fn seed_job(pool: &PgPool, project: &Project, kind: &str) -> Job {
    JobRepo::create(
        pool,
        &NewJob {
            project_id: project.id,
            user_id: 1,
            kind: kind.to_string(),
            parameters: serde_json::json!({}),
            extra_args: Vec::new(),
        },
    )
    .await
    .expect("create job")
}
