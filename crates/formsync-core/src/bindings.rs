//! Form Bindings & Cross References
//!
//! # Core Concepts
//!
//! - **Field binding**: a form field tied to one YAML path, such as
//!   `ClusterCurator[0].metadata.name`. After an error-free user edit the
//!   value found there is handed back to the form.
//! - **Reference group**: path patterns whose values name the same thing, for
//!   example a policy name and the placement binding subject pointing at it.
//!   When the user edits one member, members still holding the old value
//!   follow along.
//!
//! # Example
//!
//! ```rust,ignore
//! let binding: FieldBinding = "ClusterCurator[0].metadata.name".parse()?;
//! let (values, errors) = form_values(&[binding.required()], &snapshot);
//! ```

use formsync_changes::{ChangeKind, ChangeRecord, Origin};
use formsync_document::{parse_patterns, NodePath, PathError, PathPattern, Snapshot, SourceRange};
use formsync_validation::{Severity, ValidationError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// A form field bound to a YAML path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    /// Full path: kind, position within the kind, then fields
    pub path: NodePath,
    /// Report an error when the path holds no value
    pub required: bool,
}

impl FieldBinding {
    /// Bind a path
    #[must_use]
    pub fn new(path: NodePath) -> Self {
        Self { path, required: false }
    }

    /// Mark the binding as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl FromStr for FieldBinding {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.parse()?))
    }
}

/// Value read back for a bound form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormValue {
    /// Bound path
    pub path: NodePath,
    /// Value at that path
    pub value: Value,
}

/// Values of bound fields in `snapshot`, and errors for missing required ones
#[must_use]
pub fn form_values(bindings: &[FieldBinding], snapshot: &Snapshot) -> (Vec<FormValue>, Vec<ValidationError>) {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for binding in bindings {
        match snapshot.value_at(&binding.path).filter(|v| !v.is_null()) {
            Some(value) => values.push(FormValue {
                path: binding.path.clone(),
                value: value.clone(),
            }),
            None if binding.required => {
                let field = binding.path.segments()[2.min(binding.path.len())..].join(".");
                errors.push(ValidationError::new(
                    nearest_position(snapshot, &binding.path),
                    format!("Missing required field {field}"),
                    Severity::Error,
                ));
            }
            None => {}
        }
    }
    (values, errors)
}

/// Key range of the deepest existing node on the way to `path`
fn nearest_position(snapshot: &Snapshot, path: &NodePath) -> SourceRange {
    let mut current = Some(path.clone());
    while let Some(candidate) = current {
        if let Some(node) = snapshot.node_at(&candidate) {
            return node
                .ann
                .key_range
                .unwrap_or_else(|| SourceRange::single_line(node.line(), 1, 1));
        }
        current = candidate.parent();
    }
    SourceRange::origin()
}

/// Path patterns whose values refer to one another
#[derive(Debug, Clone, Default)]
pub struct ReferenceGroup {
    patterns: Vec<PathPattern>,
}

impl ReferenceGroup {
    /// Parse patterns; invalid ones are skipped
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: parse_patterns(patterns),
        }
    }
}

/// Paths of one snapshot sharing a referenced value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Shared value
    pub value: Value,
    /// Paths holding it
    pub paths: Vec<NodePath>,
}

/// Cross references in `snapshot`: scalar values shared by two or more
/// paths of the same group
#[must_use]
pub fn cross_references(groups: &[ReferenceGroup], snapshot: &Snapshot) -> Vec<CrossReference> {
    let mut references = Vec::new();
    for group in groups {
        let mut by_value: IndexMap<String, CrossReference> = IndexMap::new();
        for entry in snapshot.paths.matches_any(&group.patterns) {
            let Some(value) = entry.value.as_ref().filter(|v| !v.is_null()) else { continue };
            by_value
                .entry(value.to_string())
                .or_insert_with(|| CrossReference {
                    value: value.clone(),
                    paths: Vec::new(),
                })
                .paths
                .push(entry.path.clone());
        }
        references.extend(by_value.into_values().filter(|r| r.paths.len() > 1));
    }
    references
}

/// Carry user edits of referenced values over to the other references
///
/// Writes into the plain values of `snapshot` and returns one user Edit per
/// path updated. Paths on lines where `protected` holds are left alone, and
/// so are references the user already changed.
pub fn propagate_references(
    changes: &[ChangeRecord],
    references: &[CrossReference],
    snapshot: &mut Snapshot,
    protected: impl Fn(usize) -> bool,
) -> Vec<ChangeRecord> {
    let mut updates = Vec::new();
    for change in changes.iter().filter(|c| c.kind == ChangeKind::Edit) {
        let Some(edited) = snapshot.value_at(&change.diff_path).cloned() else { continue };
        for reference in references {
            if edited == reference.value || !reference.paths.contains(&change.diff_path) {
                continue;
            }
            for other in reference.paths.iter().filter(|p| **p != change.diff_path) {
                let Some((line, length)) = snapshot.node_at(other).map(|n| (n.line(), n.length())) else {
                    continue;
                };
                if protected(line) || snapshot.value_at(other) != Some(&reference.value) {
                    continue;
                }
                if snapshot.set_value(other, edited.clone()) {
                    updates.push(
                        ChangeRecord::new(ChangeKind::Edit, other.clone(), line, length, Origin::User)
                            .with_prior(Some(reference.value.clone())),
                    );
                }
            }
        }
    }
    if !updates.is_empty() {
        tracing::debug!(updated = updates.len(), "propagated references");
    }
    updates
}
