//! Per-kind pipeline parameter translation.
//!
//! Each pipeline kind accepts a fixed set of external (form) keys, declared
//! as one `{external -> internal}` table per kind. Translation validates
//! the request against that table, renames keys to what the engine expects,
//! and applies the two kind-specific shape changes: the groom per-axis
//! spacing fields collapse into a single vector value, and the optimize
//! particle count is broadcast across every anatomical domain present.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::kinds::PipelineKind;

/// One row of a kind's translation table.
#[derive(Debug, Clone, Copy)]
pub struct KeyMapping {
    /// Key as submitted by the caller.
    pub external: &'static str,
    /// Key as written into the project definition section.
    pub internal: &'static str,
}

const fn map(external: &'static str, internal: &'static str) -> KeyMapping {
    KeyMapping { external, internal }
}

/// Groom accepts its engine keys verbatim except for the spacing axes,
/// which all feed the single `spacing` vector.
const GROOM_KEYS: &[KeyMapping] = &[
    map("alignment_enabled", "alignment_enabled"),
    map("alignment_method", "alignment_method"),
    map("antialias_amount", "antialias_amount"),
    map("convert_to_mesh", "convert_to_mesh"),
    map("fill_holes", "fill_holes"),
    map("isolate", "isolate"),
    map("pad", "pad"),
    map("smooth_iterations", "smooth_iterations"),
    map("spacing_x", "spacing"),
    map("spacing_y", "spacing"),
    map("spacing_z", "spacing"),
];

const OPTIMIZE_KEYS: &[KeyMapping] = &[
    map("ending_regularization", "ending_regularization"),
    map("initial_relative_weighting", "initial_relative_weighting"),
    map("iterations_per_split", "iterations_per_split"),
    map("multiscale", "multiscale"),
    map("multiscale_particles", "multiscale_particles"),
    map("narrow_band", "narrow_band"),
    map("number_of_particles", "number_of_particles"),
    map("optimization_iterations", "optimization_iterations"),
    map("procrustes", "procrustes"),
    map("procrustes_interval", "procrustes_interval"),
    map("procrustes_scaling", "procrustes_scaling"),
    map("relative_weighting", "relative_weighting"),
    map("starting_regularization", "starting_regularization"),
    map("use_landmarks", "use_landmarks"),
    map("use_normals", "use_normals"),
];

/// Analyze takes no parameters; its output location is part of the engine
/// invocation instead.
const ANALYZE_KEYS: &[KeyMapping] = &[];

/// DeepSSM stages receive camelCase form keys and write snake_case engine
/// keys into the shared `deepssm` section.
const DEEPSSM_AUGMENT_KEYS: &[KeyMapping] = &[
    map("imageSpacing", "image_spacing"),
    map("numSamples", "aug_num_samples"),
    map("percentVariability", "percent_variability"),
    map("samplerType", "aug_sampler_type"),
    map("testingSplit", "testing_split"),
    map("validationSplit", "validation_split"),
];

const DEEPSSM_TRAIN_KEYS: &[KeyMapping] = &[
    map("batchSize", "train_batch_size"),
    map("decayLearningRate", "train_decay_learning_rate"),
    map("epochs", "train_epochs"),
    map("fineTuning", "train_fine_tuning"),
    map("ftEpochs", "train_fine_tuning_epochs"),
    map("ftLearningRate", "train_fine_tuning_learning_rate"),
    map("learningRate", "train_learning_rate"),
    map("lossFunction", "train_loss_function"),
];

const DEEPSSM_TEST_KEYS: &[KeyMapping] = &[];

/// Translation table for a pipeline kind.
pub fn schema_for(kind: PipelineKind) -> &'static [KeyMapping] {
    match kind {
        PipelineKind::Groom => GROOM_KEYS,
        PipelineKind::Optimize => OPTIMIZE_KEYS,
        PipelineKind::Analyze => ANALYZE_KEYS,
        PipelineKind::DeepssmAugment => DEEPSSM_AUGMENT_KEYS,
        PipelineKind::DeepssmTrain => DEEPSSM_TRAIN_KEYS,
        PipelineKind::DeepssmTest => DEEPSSM_TEST_KEYS,
    }
}

/// Validate and translate request parameters for `kind`.
///
/// Returns the map of internal keys ready to merge into the project
/// definition's section for the kind. `domain_count` is the number of
/// anatomical domains in the project and drives the optimize particle
/// broadcast; it is clamped to at least 1.
pub fn translate_parameters(
    kind: PipelineKind,
    params: &BTreeMap<String, String>,
    domain_count: usize,
) -> Result<BTreeMap<String, String>, CoreError> {
    let schema = schema_for(kind);
    let mut out = BTreeMap::new();

    for (key, value) in params {
        let mapping = schema
            .iter()
            .find(|m| m.external == key)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown parameter \"{key}\" for pipeline kind \"{kind}\""
                ))
            })?;

        match (kind, mapping.external) {
            // Collapsed separately below.
            (PipelineKind::Groom, "spacing_x" | "spacing_y" | "spacing_z") => {}
            (PipelineKind::Optimize, "number_of_particles") => {
                out.insert(
                    mapping.internal.to_string(),
                    broadcast_across_domains(value, domain_count)?,
                );
            }
            _ => {
                out.insert(mapping.internal.to_string(), value.clone());
            }
        }
    }

    if kind == PipelineKind::Groom {
        if let Some(spacing) = collapse_spacing(params)? {
            out.insert("spacing".to_string(), spacing);
        }
    }

    Ok(out)
}

/// Collapse `spacing_x`/`spacing_y`/`spacing_z` into one `"x y z"` vector.
///
/// Either all three axes are present (each a valid number) or none are.
fn collapse_spacing(params: &BTreeMap<String, String>) -> Result<Option<String>, CoreError> {
    let axes = ["spacing_x", "spacing_y", "spacing_z"];
    let present: Vec<&str> = axes
        .iter()
        .filter_map(|a| params.get(*a).map(|v| v.as_str()))
        .collect();

    if present.is_empty() {
        return Ok(None);
    }
    if present.len() != axes.len() {
        return Err(CoreError::Validation(
            "Spacing requires all of spacing_x, spacing_y, spacing_z".to_string(),
        ));
    }
    for value in &present {
        value.trim().parse::<f64>().map_err(|_| {
            CoreError::Validation(format!("Spacing component \"{value}\" is not a number"))
        })?;
    }

    Ok(Some(
        present
            .iter()
            .map(|v| v.trim())
            .collect::<Vec<_>>()
            .join(" "),
    ))
}

/// Repeat a single particle-count value once per domain.
///
/// The engine expects one count per anatomical domain, space-separated,
/// while the request carries exactly one value.
fn broadcast_across_domains(value: &str, domain_count: usize) -> Result<String, CoreError> {
    let count: u32 = value.trim().parse().map_err(|_| {
        CoreError::Validation(format!(
            "Particle count \"{value}\" is not a positive integer"
        ))
    })?;
    let per_domain = count.to_string();
    Ok(vec![per_domain; domain_count.max(1)].join(" "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -- translate_parameters -------------------------------------------------

    #[test]
    fn unknown_key_rejected() {
        let err = translate_parameters(
            PipelineKind::Groom,
            &params(&[("particle_count", "128")]),
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("particle_count"));
    }

    #[test]
    fn analyze_accepts_no_parameters() {
        assert!(translate_parameters(PipelineKind::Analyze, &params(&[]), 1)
            .unwrap()
            .is_empty());
        assert!(
            translate_parameters(PipelineKind::Analyze, &params(&[("range", "2.0")]), 1).is_err()
        );
    }

    #[test]
    fn groom_passthrough_keys_keep_values() {
        let out = translate_parameters(
            PipelineKind::Groom,
            &params(&[("alignment_method", "Center of Mass"), ("pad", "4")]),
            1,
        )
        .unwrap();
        assert_eq!(out["alignment_method"], "Center of Mass");
        assert_eq!(out["pad"], "4");
    }

    // -- spacing collapse -----------------------------------------------------

    #[test]
    fn spacing_axes_collapse_into_vector() {
        let out = translate_parameters(
            PipelineKind::Groom,
            &params(&[
                ("spacing_x", "0.5"),
                ("spacing_y", "0.5"),
                ("spacing_z", "1.25"),
            ]),
            1,
        )
        .unwrap();
        assert_eq!(out["spacing"], "0.5 0.5 1.25");
        assert!(!out.contains_key("spacing_x"));
    }

    #[test]
    fn partial_spacing_rejected() {
        let err = translate_parameters(
            PipelineKind::Groom,
            &params(&[("spacing_x", "0.5"), ("spacing_y", "0.5")]),
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("spacing_z"));
    }

    #[test]
    fn non_numeric_spacing_rejected() {
        assert!(translate_parameters(
            PipelineKind::Groom,
            &params(&[
                ("spacing_x", "wide"),
                ("spacing_y", "0.5"),
                ("spacing_z", "0.5"),
            ]),
            1,
        )
        .is_err());
    }

    // -- particle broadcast ---------------------------------------------------

    #[test]
    fn particle_count_broadcast_across_domains() {
        let out = translate_parameters(
            PipelineKind::Optimize,
            &params(&[("number_of_particles", "128")]),
            3,
        )
        .unwrap();
        assert_eq!(out["number_of_particles"], "128 128 128");
    }

    #[test]
    fn single_domain_broadcast_is_identity() {
        let out = translate_parameters(
            PipelineKind::Optimize,
            &params(&[("number_of_particles", "64")]),
            1,
        )
        .unwrap();
        assert_eq!(out["number_of_particles"], "64");
    }

    #[test]
    fn zero_domain_count_still_yields_one_value() {
        let out = translate_parameters(
            PipelineKind::Optimize,
            &params(&[("number_of_particles", "64")]),
            0,
        )
        .unwrap();
        assert_eq!(out["number_of_particles"], "64");
    }

    #[test]
    fn non_integer_particle_count_rejected() {
        assert!(translate_parameters(
            PipelineKind::Optimize,
            &params(&[("number_of_particles", "many")]),
            2,
        )
        .is_err());
    }

    // -- deepssm key renaming -------------------------------------------------

    #[test]
    fn deepssm_augment_maps_camel_case() {
        let out = translate_parameters(
            PipelineKind::DeepssmAugment,
            &params(&[
                ("numSamples", "300"),
                ("samplerType", "Gaussian"),
                ("validationSplit", "20"),
            ]),
            1,
        )
        .unwrap();
        assert_eq!(out["aug_num_samples"], "300");
        assert_eq!(out["aug_sampler_type"], "Gaussian");
        assert_eq!(out["validation_split"], "20");
        assert!(!out.contains_key("numSamples"));
    }

    #[test]
    fn deepssm_train_maps_fine_tuning_keys() {
        let out = translate_parameters(
            PipelineKind::DeepssmTrain,
            &params(&[
                ("epochs", "100"),
                ("ftEpochs", "10"),
                ("ftLearningRate", "0.001"),
            ]),
            1,
        )
        .unwrap();
        assert_eq!(out["train_epochs"], "100");
        assert_eq!(out["train_fine_tuning_epochs"], "10");
        assert_eq!(out["train_fine_tuning_learning_rate"], "0.001");
    }
}
