//! Result materialization: mapping engine output back into result rows.
//!
//! The previous generation was deleted during staging, so everything here
//! is pure creation. Engine output files are uploaded to the blob store
//! under the project's prefix as their rows are created.

use std::collections::HashMap;
use std::path::Path;

use sqlx::PgPool;

use shapecloud_core::project::ProjectDefinition;
use shapecloud_core::results;
use shapecloud_core::types::DbId;
use shapecloud_db::models::project::Project;
use shapecloud_db::models::result::{NewParticleSet, ParticleSet};
use shapecloud_db::repositories::{ResultRepo, ShapeRepo};
use shapecloud_engine::AnalysisManifest;

use crate::error::PipelineError;
use crate::staging::{blob_key, project_prefix};
use crate::storage::BlobStore;

/// Materialize groom output: one groomed row per domain carrying a
/// `groomed` key, backed by the originating input shape resolved by the
/// trailing filename of the domain's `shape` value.
pub async fn materialize_groom(
    pool: &PgPool,
    store: &dyn BlobStore,
    project: &Project,
    definition: &ProjectDefinition,
    workspace: &Path,
) -> Result<usize, PipelineError> {
    let shapes = ShapeRepo::shapes_for_project(pool, project.id).await?;
    let by_stem: HashMap<&str, DbId> = shapes
        .iter()
        .map(|s| (results::filename_stem(&s.file_key), s.id))
        .collect();
    let prefix = project_prefix(&project.file_key);

    let mut created = 0;
    for row in definition.data_rows() {
        for (suffix, group) in results::group_by_domain(&row) {
            let Some(groomed_value) = group.get("groomed") else {
                continue;
            };
            let Some(shape_value) = group.get("shape") else {
                tracing::warn!(domain = %suffix, "Groomed output without a shape reference");
                continue;
            };
            let Some(&shape_id) = by_stem.get(results::filename_stem(shape_value)) else {
                tracing::warn!(shape = %shape_value, "No input shape matches groomed output");
                continue;
            };
            let Some(key) = upload_output(store, workspace, prefix, groomed_value).await else {
                continue;
            };
            ResultRepo::create_groomed(pool, project.id, shape_id, &key).await?;
            created += 1;
        }
    }
    Ok(created)
}

/// Materialize optimize output: one particle set per domain, resolved to
/// its groomed row by trailing filename, carrying forward the groomed
/// row's subject and anatomy. `local`/`world` files attach iff present;
/// an `alignment` value is stored as inline transform text, never read
/// from a file.
pub async fn materialize_optimize(
    pool: &PgPool,
    store: &dyn BlobStore,
    project: &Project,
    definition: &ProjectDefinition,
    workspace: &Path,
) -> Result<usize, PipelineError> {
    let shapes = ShapeRepo::shapes_for_project(pool, project.id).await?;
    let shapes_by_id: HashMap<DbId, (&str, DbId)> = shapes
        .iter()
        .map(|s| (s.id, (s.anatomy_id.as_str(), s.subject_id)))
        .collect();

    let groomed_rows = ResultRepo::groomed_for_project(pool, project.id).await?;
    let groomed_by_name: HashMap<&str, (DbId, DbId)> = groomed_rows
        .iter()
        .map(|g| (results::trailing_filename(&g.file_key), (g.id, g.shape_id)))
        .collect();
    let prefix = project_prefix(&project.file_key);

    let mut created = 0;
    for row in definition.data_rows() {
        for (suffix, group) in results::group_by_domain(&row) {
            let Some(groomed_value) = group.get("groomed") else {
                continue;
            };
            let Some(&(groomed_id, shape_id)) =
                groomed_by_name.get(results::trailing_filename(groomed_value))
            else {
                tracing::warn!(
                    domain = %suffix,
                    groomed = %groomed_value,
                    "No groomed row matches optimize output",
                );
                continue;
            };
            let Some(&(anatomy_id, subject_id)) = shapes_by_id.get(&shape_id) else {
                tracing::warn!(groomed_id, "Groomed row lost its input shape");
                continue;
            };

            let local_file_key = match group.get("local_particles") {
                Some(value) => upload_output(store, workspace, prefix, value).await,
                None => None,
            };
            let world_file_key = match group.get("world_particles") {
                Some(value) => upload_output(store, workspace, prefix, value).await,
                None => None,
            };

            ResultRepo::create_particle_set(
                pool,
                &NewParticleSet {
                    project_id: project.id,
                    groomed_id,
                    subject_id,
                    anatomy_id: anatomy_id.to_string(),
                    local_file_key,
                    world_file_key,
                    transform: group.get("alignment").cloned(),
                },
            )
            .await?;
            created += 1;
        }
    }
    Ok(created)
}

/// Materialize an analyze manifest: the analysis row, its modes, and its
/// mean shapes.
pub async fn materialize_analyze(
    pool: &PgPool,
    store: &dyn BlobStore,
    project: &Project,
    manifest: &AnalysisManifest,
    workspace: &Path,
) -> Result<(), PipelineError> {
    let charts = serde_json::Value::Array(manifest.charts.clone());
    let analysis = ResultRepo::create_analysis(pool, project.id, &charts).await?;

    for mode in &manifest.modes {
        let pca_values = serde_json::Value::Array(mode.pca_values.clone());
        ResultRepo::create_analysis_mode(
            pool,
            analysis.id,
            mode.mode,
            mode.eigen_value,
            mode.explained_variance,
            mode.cumulative_explained_variance,
            &pca_values,
        )
        .await?;
    }

    let particle_sets = ResultRepo::particle_sets_for_project(pool, project.id).await?;
    let prefix = project_prefix(&project.file_key);

    for (index, mesh) in manifest.mean.meshes.iter().enumerate() {
        let Some(key) = upload_output(store, workspace, prefix, mesh).await else {
            continue;
        };
        let particle_set_id = match_reconstruction_to_particles(index, &particle_sets);
        if particle_set_id.is_none() {
            tracing::warn!(index, "Mean shape has no particle set at its position");
        }
        ResultRepo::create_mean_shape(pool, analysis.id, &key, particle_set_id).await?;
    }

    Ok(())
}

/// Associate a reconstructed mean shape with a particle set by its
/// position in the project's (subject, anatomy)-ordered particle list.
///
/// Positional matching is a fragile coupling to the engine's output order;
/// it is kept in this one function so a keyed strategy can replace it
/// without touching the rest of the materializer.
fn match_reconstruction_to_particles(
    index: usize,
    particle_sets: &[ParticleSet],
) -> Option<DbId> {
    particle_sets.get(index).map(|p| p.id)
}

/// Upload one engine output file; returns its blob key, or `None` with a
/// warning when the engine never wrote the file.
async fn upload_output(
    store: &dyn BlobStore,
    workspace: &Path,
    prefix: &str,
    relative: &str,
) -> Option<String> {
    let src = workspace.join(relative);
    let key = blob_key(prefix, relative);
    match store.upload(&src, &key).await {
        Ok(()) => Some(key),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Engine output missing from workspace");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn particle_set(id: DbId, subject_id: DbId, anatomy: &str) -> ParticleSet {
        ParticleSet {
            id,
            project_id: 1,
            groomed_id: id,
            subject_id,
            anatomy_id: anatomy.to_string(),
            local_file_key: None,
            world_file_key: None,
            transform: None,
            created_at: Utc::now(),
        }
    }

    // -- match_reconstruction_to_particles ------------------------------------

    #[test]
    fn reconstruction_matches_by_position() {
        let sets = vec![
            particle_set(11, 1, "left"),
            particle_set(12, 1, "right"),
            particle_set(13, 2, "left"),
        ];
        assert_eq!(match_reconstruction_to_particles(0, &sets), Some(11));
        assert_eq!(match_reconstruction_to_particles(2, &sets), Some(13));
    }

    #[test]
    fn reconstruction_past_the_list_matches_nothing() {
        let sets = vec![particle_set(11, 1, "left")];
        assert_eq!(match_reconstruction_to_particles(1, &sets), None);
        assert_eq!(match_reconstruction_to_particles(0, &[]), None);
    }
}
