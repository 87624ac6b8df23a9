//! Grouping of flat engine result rows into per-domain sub-maps.
//!
//! A result row is a flat string map whose keys carry a semantic prefix
//! (`shape`, `groomed`, `local_particles`, ...) and a suffix naming the
//! anatomical domain the value belongs to (`_1`, `_2`, or `_file` for
//! single-domain documents). Grouping collects each domain's values under
//! its suffix; the `name` prefix labels the whole row and is excluded.

use std::collections::BTreeMap;

/// A flat key/value row from the engine's output manifest or the `data`
/// array of a project definition.
pub type ResultRow = BTreeMap<String, String>;

/// Per-domain view of one row: prefix -> value, keyed by domain suffix.
pub type DomainGroups = BTreeMap<String, BTreeMap<String, String>>;

/// Row prefix that names the subject rather than a domain value.
pub const NAME_PREFIX: &str = "name";

/// Recognized domain-value prefixes, checked longest-first so that
/// `local_particles_1` is never misread as a `local` prefix.
pub const DOMAIN_PREFIXES: &[&str] = &[
    "world_particles",
    "local_particles",
    "landmarks_file",
    "constraints",
    "procrustes",
    "alignment",
    "groomed",
    "shape",
    "image",
];

/// Split a row key into its recognized prefix and domain suffix.
///
/// `shape_1` -> `("shape", "1")`, `groomed_file` -> `("groomed", "file")`.
/// Returns `None` for the `name` prefix and for unrecognized keys.
pub fn split_key(key: &str) -> Option<(&'static str, &str)> {
    if key == NAME_PREFIX || key.starts_with("name_") {
        return None;
    }
    for prefix in DOMAIN_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            match rest.strip_prefix('_') {
                Some(suffix) => return Some((prefix, suffix)),
                None if rest.is_empty() => return Some((prefix, "")),
                None => {}
            }
        }
    }
    None
}

/// Regroup one flat row by domain suffix.
///
/// Keys with empty values are treated as absent, matching how spreadsheet
/// cells come through the engine's rewritten definition.
pub fn group_by_domain(row: &ResultRow) -> DomainGroups {
    let mut groups: DomainGroups = BTreeMap::new();
    for (key, value) in row {
        if value.is_empty() {
            continue;
        }
        if let Some((prefix, suffix)) = split_key(key) {
            groups
                .entry(suffix.to_string())
                .or_default()
                .insert(prefix.to_string(), value.clone());
        }
    }
    groups
}

/// Trailing path component of a file value.
pub fn trailing_filename(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}

/// Trailing path component with its final extension removed.
pub fn filename_stem(value: &str) -> &str {
    let name = trailing_filename(value);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
