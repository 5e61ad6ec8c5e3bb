//! Schema compilation
//!
//! A session validates against either one schema for every resource or a
//! list of per-type entries:
//!
//! ```json
//! [{ "type": "Policy", "required": 1, "schema": { "type": "object" } }]
//! ```
//!
//! `required` (alias `requiredCount`) is the number of resources of that
//! type the buffer must contain.

use crate::error::{Result, ValidationSetupError};
use jsonschema::JSONSchema;
use serde_json::Value;

/// One compiled schema
pub struct CompiledSchema {
    /// Resource type the schema is for (empty for a lone schema)
    pub kind: String,
    /// Number of resources of this type that must be present
    pub required_count: Option<usize>,
    /// Raw schema, walked for custom keywords
    pub raw: Value,
    pub(crate) compiled: JSONSchema,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("kind", &self.kind)
            .field("required_count", &self.required_count)
            .finish_non_exhaustive()
    }
}

fn compile_one(kind: &str, raw: &Value) -> Result<JSONSchema> {
    JSONSchema::compile(raw).map_err(|err| ValidationSetupError::Compile {
        kind: kind.to_string(),
        message: err.to_string(),
    })
}

/// Compiled schemas of a session
#[derive(Debug)]
pub struct SchemaSet {
    entries: Vec<CompiledSchema>,
}

impl SchemaSet {
    /// Compile a lone schema or a list of per-type entries
    ///
    /// # Errors
    /// Returns error if an entry is malformed or a schema does not compile
    pub fn compile(schema: &Value) -> Result<Self> {
        let entries = match schema {
            Value::Array(list) => list
                .iter()
                .enumerate()
                .map(|(index, entry)| compile_entry(index, entry))
                .collect::<Result<Vec<_>>>()?,
            single => vec![CompiledSchema {
                kind: String::new(),
                required_count: None,
                raw: single.clone(),
                compiled: compile_one("", single)?,
            }],
        };
        tracing::debug!(schemas = entries.len(), "compiled schemas");
        Ok(Self { entries })
    }

    /// Compiled entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[CompiledSchema] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile_entry(index: usize, entry: &Value) -> Result<CompiledSchema> {
    let invalid = |reason: &str| ValidationSetupError::InvalidEntry {
        index,
        reason: reason.to_string(),
    };
    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing 'type'"))?;
    let raw = entry.get("schema").ok_or_else(|| invalid("missing 'schema'"))?;
    let required_count = entry
        .get("requiredCount")
        .or_else(|| entry.get("required"))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok());
    Ok(CompiledSchema {
        kind: kind.to_string(),
        required_count,
        raw: raw.clone(),
        compiled: compile_one(kind, raw)?,
    })
}
