//! Validator
//!
//! Validates every resource of a snapshot against the schema chosen for its
//! kind and positions each finding in the source text.
//!
//! # Core Concepts
//!
//! - **Selection**: a lone schema applies to every resource; otherwise the
//!   entry whose type equals the kind, or failing that the most similar type
//!   above the similarity threshold.
//! - **Severity**: structural problems (`required`, `const`, `pattern`,
//!   `type`, name/label/dependency rules) block; the rest advise.
//! - **Protection**: findings on protected lines are dropped, the user cannot
//!   act on them.
//!
//! # Example
//!
//! ```rust,ignore
//! let set = SchemaSet::compile(&schema)?;
//! let validator = Validator::new(set);
//! let errors = validator.validate(&snapshot, |_line| false);
//! ```

use crate::keywords::check_keywords;
use crate::locate::{locate, Anchor};
use crate::schema::{CompiledSchema, SchemaSet};
use crate::types::{Severity, ValidationError};
use formsync_document::{best_match, NodePath, Snapshot, SourceRange};
use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde_json::Value;

/// Default similarity a kind needs to pick a schema of another type
pub const DEFAULT_KIND_THRESHOLD: f64 = 0.7;

/// Schema validator of a session
#[derive(Debug)]
pub struct Validator {
    schemas: SchemaSet,
    kind_threshold: f64,
}

impl Validator {
    /// Create validator over compiled schemas
    #[must_use]
    pub fn new(schemas: SchemaSet) -> Self {
        Self {
            schemas,
            kind_threshold: DEFAULT_KIND_THRESHOLD,
        }
    }

    /// Set the kind similarity threshold
    #[must_use]
    pub fn with_kind_threshold(mut self, threshold: f64) -> Self {
        self.kind_threshold = threshold;
        self
    }

    /// Schema for a resource kind
    #[must_use]
    pub fn schema_for(&self, kind: Option<&str>) -> Option<&CompiledSchema> {
        let entries = self.schemas.entries();
        if let [only] = entries {
            return Some(only);
        }
        let kind = kind?;
        if let Some(exact) = entries.iter().find(|e| e.kind == kind) {
            return Some(exact);
        }
        let (i, rating) = best_match(kind, entries.iter().map(|e| e.kind.as_str()))?;
        (rating > self.kind_threshold).then(|| &entries[i])
    }

    /// Validate every resource of `snapshot`
    ///
    /// `is_protected` tells whether a 1-based line lies in a protected range.
    #[must_use]
    pub fn validate(&self, snapshot: &Snapshot, is_protected: impl Fn(usize) -> bool) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (resource, (bucket, index)) in snapshot.resources.iter().zip(snapshot.addresses()) {
            let kind = resource.get("kind").and_then(Value::as_str);
            let Some(schema) = self.schema_for(kind) else { continue };
            let prefix = NodePath::document(bucket, *index);
            validate_resource(schema, snapshot, &prefix, resource, &mut errors);
        }
        errors.extend(self.required_counts(&snapshot.resources));
        errors.retain(|e| !is_protected(e.line()));
        tracing::debug!(errors = errors.len(), "validated snapshot");
        errors
    }

    fn required_counts(&self, resources: &[Value]) -> Vec<ValidationError> {
        self.schemas
            .entries()
            .iter()
            .filter_map(|entry| {
                let required = entry.required_count?;
                let present = resources
                    .iter()
                    .filter(|r| r.get("kind").and_then(Value::as_str) == Some(entry.kind.as_str()))
                    .count();
                (present < required).then(|| {
                    ValidationError::new(
                        SourceRange::origin(),
                        format!("Requires {required} {}", entry.kind),
                        Severity::Error,
                    )
                })
            })
            .collect()
    }
}

/// Findings for `metadata.name`/`namespace` values that are not strings
///
/// An unquoted `{{ template }}` reads as a flow mapping; the buffer parses
/// but the name is unusable.
#[must_use]
pub fn template_syntax_errors(snapshot: &Snapshot) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (bucket, index) in snapshot.addresses() {
        let metadata = NodePath::document(bucket, *index).child("metadata");
        for field in ["name", "namespace"] {
            let path = metadata.child(field);
            let Some(node) = snapshot.node_at(&path) else { continue };
            if node.ann.incomplete || matches!(node.scalar(), Some(Value::String(_) | Value::Null)) {
                continue;
            }
            let position = node.ann.value_range.map_or_else(
                || SourceRange::single_line(node.line(), 1, 1),
                |r| SourceRange::single_line(node.line(), r.start.col, r.end.col),
            );
            errors.push(ValidationError::new(
                position,
                format!("Invalid template name syntax for metadata.{field}: quote template expressions"),
                Severity::Error,
            ));
        }
    }
    errors
}

/// Split a JSON pointer into unescaped segments
fn pointer_segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Message, severity and anchor for a standard keyword failure
fn describe(kind: &ValidationErrorKind, fallback: &str) -> (String, Severity, Anchor) {
    match kind {
        ValidationErrorKind::Required { property } => {
            let property = display_value(property);
            (
                format!("Must have required property '{property}'"),
                Severity::Error,
                Anchor::MissingProperty(property),
            )
        }
        ValidationErrorKind::Constant { expected_value } => (
            format!("Must be equal to constant: {}", display_value(expected_value)),
            Severity::Error,
            Anchor::Value,
        ),
        ValidationErrorKind::Enum { options } => {
            let allowed: Vec<String> = options
                .as_array()
                .map(|items| items.iter().map(|v| format!("\"{}\"", display_value(v))).collect())
                .unwrap_or_default();
            (
                format!("Must be equal to one of the allowed values: {}", allowed.join(", ")),
                Severity::Warning,
                Anchor::Value,
            )
        }
        ValidationErrorKind::Pattern { pattern } => {
            (format!("Must match pattern \"{pattern}\""), Severity::Error, Anchor::Value)
        }
        ValidationErrorKind::Type { kind: TypeKind::Single(ty) } => {
            (format!("Must be {ty}"), Severity::Error, Anchor::Value)
        }
        ValidationErrorKind::Type { .. } => (capitalize(fallback), Severity::Error, Anchor::Value),
        _ => (capitalize(fallback), Severity::Warning, Anchor::Value),
    }
}

fn validate_resource(
    schema: &CompiledSchema,
    snapshot: &Snapshot,
    prefix: &NodePath,
    resource: &Value,
    errors: &mut Vec<ValidationError>,
) {
    if let Err(failures) = schema.compiled.validate(resource) {
        for failure in failures {
            let path = pointer_segments(&failure.instance_path.to_string());
            let (message, severity, anchor) = describe(&failure.kind, &failure.to_string());
            errors.push(ValidationError::new(
                locate(snapshot, prefix, &path, &anchor),
                message,
                severity,
            ));
        }
    }
    for violation in check_keywords(&schema.raw, resource) {
        errors.push(ValidationError::new(
            locate(snapshot, prefix, &violation.instance_path, &Anchor::Value),
            violation.message,
            violation.keyword.severity(),
        ));
    }
}
