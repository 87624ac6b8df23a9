//! The project definition document.
//!
//! A JSON object with a `data` array of per-subject string maps plus one
//! parameter section per pipeline kind. The engine rewrites the document in
//! place for most kinds, so this wrapper supports both reading result rows
//! out of it and merging translated parameters into it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::results::{self, ResultRow};

/// Key of the per-subject rows array.
const DATA_KEY: &str = "data";

#[derive(Debug, Clone)]
pub struct ProjectDefinition {
    root: Map<String, Value>,
}

impl ProjectDefinition {
    /// Parse a definition document from raw JSON bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::Validation(format!("Invalid project definition: {e}")))?;
        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(CoreError::Validation(
                "Project definition must be a JSON object".to_string(),
            )),
        }
    }

    /// Serialize back to pretty-printed JSON bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // A Map of JSON values cannot fail to serialize.
        serde_json::to_vec_pretty(&Value::Object(self.root.clone())).unwrap_or_default()
    }

    /// The per-subject rows, with scalar values rendered as strings.
    pub fn data_rows(&self) -> Vec<ResultRow> {
        let Some(Value::Array(rows)) = self.root.get(DATA_KEY) else {
            return Vec::new();
        };
        rows.iter()
            .filter_map(|row| match row {
                Value::Object(fields) => Some(
                    fields
                        .iter()
                        .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                        .collect::<ResultRow>(),
                ),
                _ => None,
            })
            .collect()
    }

    /// Number of distinct anatomical domains across the data rows, derived
    /// from the suffixes of `shape`-prefixed keys. A project with no rows
    /// counts as one domain.
    pub fn domain_count(&self) -> usize {
        let mut suffixes = std::collections::BTreeSet::new();
        for row in self.data_rows() {
            for key in row.keys() {
                if let Some(("shape", suffix)) = results::split_key(key) {
                    suffixes.insert(suffix.to_string());
                }
            }
        }
        suffixes.len().max(1)
    }

    /// Parameter section for a pipeline kind, if present.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.root.get(name) {
            Some(Value::Object(section)) => Some(section),
            _ => None,
        }
    }

    /// Merge translated parameters into a section, creating it if absent.
    /// Existing keys not named in `entries` are left untouched.
    pub fn merge_section(&mut self, name: &str, entries: &BTreeMap<String, String>) {
        let section = self
            .root
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !section.is_object() {
            *section = Value::Object(Map::new());
        }
        if let Value::Object(section) = section {
            for (key, value) in entries {
                section.insert(key.clone(), Value::String(value.clone()));
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
