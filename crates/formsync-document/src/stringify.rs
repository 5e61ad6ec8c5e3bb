//! Canonical YAML rendering of resources
//!
//! Rendering rules: `name` and `namespace` lead every mapping, numeric-string
//! keys become sequence dashes, `key: null` renders as a bare `key:` and
//! documents are joined with `---` lines. Empty resources are skipped.

use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static NUMERIC_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)'\d+':(\s|$)\s*").expect("valid regex"));
static NULL_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m):[ \t]*null$").expect("valid regex"));

const LEADING_KEYS: [&str; 2] = ["name", "namespace"];

/// Render resources as one multi-document YAML text
///
/// # Errors
/// Returns error if a resource cannot be serialized
pub fn stringify(resources: &[Value]) -> Result<String> {
    let mut documents = Vec::with_capacity(resources.len());
    for resource in resources {
        if is_empty_resource(resource) {
            continue;
        }
        documents.push(stringify_one(resource)?);
    }
    Ok(documents.join("---\n"))
}

/// Render one resource
///
/// # Errors
/// Returns error if the value cannot be serialized
pub fn stringify_one(resource: &Value) -> Result<String> {
    let ordered = order_keys(resource);
    let text = serde_yaml::to_string(&ordered)?;
    let text = NUMERIC_KEY.replace_all(&text, "- ");
    Ok(NULL_VALUE.replace_all(&text, ":").into_owned())
}

fn is_empty_resource(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Copy of `value` with `name`/`namespace` first in every mapping
#[must_use]
pub fn order_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut ordered = Map::with_capacity(map.len());
            for key in LEADING_KEYS {
                if let Some(v) = map.get(key) {
                    ordered.insert(key.to_string(), order_keys(v));
                }
            }
            for (key, v) in map {
                if !LEADING_KEYS.contains(&key.as_str()) {
                    ordered.insert(key.clone(), order_keys(v));
                }
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(order_keys).collect()),
        other => other.clone(),
    }
}
