//! Integration tests for generational result replacement: deleting a
//! kind's previous generation before the new one is written, and the
//! cascades between result tables.

mod common;

use sqlx::PgPool;

use shapecloud_core::kinds::PipelineKind;
use shapecloud_db::models::result::NewParticleSet;
use shapecloud_db::repositories::ResultRepo;

// ---------------------------------------------------------------------------
// Test: a second groom generation fully supersedes the first
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn second_groom_generation_supersedes_first(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let (_, shapes) =
        common::seed_subject_with_shapes(&pool, &project, "s01", &["left", "right"]).await;

    for shape in &shapes {
        ResultRepo::create_groomed(&pool, project.id, shape.id, "groomed/gen1.nrrd")
            .await
            .unwrap();
    }

    let deleted = ResultRepo::delete_generation(&pool, project.id, PipelineKind::Groom)
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    ResultRepo::create_groomed(&pool, project.id, shapes[0].id, "groomed/gen2.nrrd")
        .await
        .unwrap();

    let rows = ResultRepo::groomed_for_project(&pool, project.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].file_key, "groomed/gen2.nrrd");
}

// ---------------------------------------------------------------------------
// Test: optimize deletion leaves the groomed generation untouched
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn optimize_deletion_keeps_groomed_rows(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let (subject, shapes) =
        common::seed_subject_with_shapes(&pool, &project, "s01", &["left"]).await;

    let groomed = ResultRepo::create_groomed(&pool, project.id, shapes[0].id, "groomed/a.nrrd")
        .await
        .unwrap();
    ResultRepo::create_particle_set(
        &pool,
        &NewParticleSet {
            project_id: project.id,
            groomed_id: groomed.id,
            subject_id: subject.id,
            anatomy_id: "left".to_string(),
            local_file_key: Some("particles/a_local.particles".to_string()),
            world_file_key: Some("particles/a_world.particles".to_string()),
            transform: None,
        },
    )
    .await
    .unwrap();

    let deleted = ResultRepo::delete_generation(&pool, project.id, PipelineKind::Optimize)
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    assert!(ResultRepo::particle_sets_for_project(&pool, project.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        ResultRepo::groomed_for_project(&pool, project.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

// ---------------------------------------------------------------------------
// Test: groom deletion cascades to particle sets built on it
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn groom_deletion_cascades_to_particle_sets(pool: PgPool) {
    let project = common::seed_project(&pool).await;
    let (subject, shapes) =
        common::seed_subject_with_shapes(&pool, &project, "s01", &["left"]).await;

    let groomed = ResultRepo::create_groomed(&pool, project.id, shapes[0].id, "groomed/a.nrrd")
        .await
        .unwrap();
    ResultRepo::create_particle_set(
        &pool,
        &NewParticleSet {
            project_id: project.id,
            groomed_id: groomed.id,
            subject_id: subject.id,
            anatomy_id: "left".to_string(),
            local_file_key: None,
            world_file_key: None,
            transform: None,
        },
    )
    .await
    .unwrap();

    ResultRepo::delete_generation(&pool, project.id, PipelineKind::Groom)
        .await
        .unwrap();

    assert!(ResultRepo::particle_sets_for_project(&pool, project.id)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Test: analysis deletion cascades to modes and mean shapes
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn analysis_deletion_cascades(pool: PgPool) {
    let project = common::seed_project(&pool).await;

    let analysis = ResultRepo::create_analysis(&pool, project.id, &serde_json::json!([]))
        .await
        .unwrap();
    ResultRepo::create_analysis_mode(
        &pool,
        analysis.id,
        1,
        0.82,
        61.0,
        61.0,
        &serde_json::json!([]),
    )
    .await
    .unwrap();
    ResultRepo::create_mean_shape(&pool, analysis.id, "analysis/mean_0.vtk", None)
        .await
        .unwrap();

    let deleted = ResultRepo::delete_generation(&pool, project.id, PipelineKind::Analyze)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(ResultRepo::analyses_for_project(&pool, project.id)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Test: deepssm kinds have no generation to delete
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn deepssm_kinds_delete_nothing(pool: PgPool) {
    let project = common::seed_project(&pool).await;

    for kind in [
        PipelineKind::DeepssmAugment,
        PipelineKind::DeepssmTrain,
        PipelineKind::DeepssmTest,
    ] {
        let deleted = ResultRepo::delete_generation(&pool, project.id, kind)
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
