//! Three-way Reconciler
//!
//! Merges a new form output into the user's customized resources.
//!
//! # Core Concepts
//!
//! - **ChangeStack**: `base` is what the form produced last time, `custom` is
//!   what the buffer held after the user's last error-free edit.
//! - **Three-way**: the form's movement (`base` → new form) is replayed onto
//!   `custom`, except at paths the user has a pending edit for.
//! - **User wins**: a pending edit at the exact path of a form change keeps
//!   the user's value; the edit's prior value moves to the new form value so
//!   the edit still reads as a deviation from the form.
//!
//! # Example
//!
//! ```rust,ignore
//! let outcome = reconcile(&stack, &pending_edits, &form_resources);
//! let yaml = stringify(&outcome.resources)?;
//! session_stack = outcome.stack;
//! ```

use crate::matching::pair_resources;
use formsync_changes::{diff_values, ChangeRecord, Diff};
use formsync_document::{bucket_for, get_path, set_path, unset_path, NodePath};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Form output and user customization of the previous round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeStack {
    /// Resources the form produced
    pub base: Vec<Value>,
    /// Resources after the user's customizations
    pub custom: Vec<Value>,
}

impl ChangeStack {
    /// Create stack
    #[inline]
    #[must_use]
    pub fn new(base: Vec<Value>, custom: Vec<Value>) -> Self {
        Self { base, custom }
    }
}

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Merged resources, in form order
    pub resources: Vec<Value>,
    /// Pending edits with refreshed prior values
    pub edits: Vec<ChangeRecord>,
    /// Stack for the next round
    pub stack: ChangeStack,
}

/// Kind bucket and position of every resource of a list
fn addresses(resources: &[Value]) -> Vec<NodePath> {
    let mut seen: Vec<(String, usize)> = Vec::new();
    resources
        .iter()
        .map(|resource| {
            let kind = bucket_for(resource);
            let index = match seen.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, count)) => {
                    *count += 1;
                    *count - 1
                }
                None => {
                    seen.push((kind.clone(), 1));
                    0
                }
            };
            NodePath::document(&kind, index)
        })
        .collect()
}

/// Merge `current_form` into the customized resources of `stack`
#[must_use]
pub fn reconcile(stack: &ChangeStack, pending: &[ChangeRecord], current_form: &[Value]) -> Reconciled {
    let mut edits = pending.to_vec();
    let custom_to_base = pair_resources(&stack.custom, &stack.base);
    let base_to_form = pair_resources(&stack.base, current_form);
    let custom_addresses = addresses(&stack.custom);

    // (form position, resource); extras carry no form position
    let mut merged: Vec<(Option<usize>, Value)> = Vec::new();
    let mut form_used = vec![false; current_form.len()];

    for (c, custom) in stack.custom.iter().enumerate() {
        let address = &custom_addresses[c];
        let Some(b) = custom_to_base[c] else {
            merged.push((None, custom.clone()));
            continue;
        };
        match base_to_form[b] {
            Some(f) => {
                form_used[f] = true;
                let mut resource = custom.clone();
                replay(&stack.base[b], &current_form[f], &mut resource, address, &mut edits);
                merged.push((Some(f), resource));
            }
            None => {
                let edited = edits
                    .iter()
                    .any(|edit| address.is_prefix_of(&edit.target_path));
                if edited {
                    merged.push((None, custom.clone()));
                } else {
                    tracing::debug!(resource = %address, "form removed resource");
                }
            }
        }
    }

    for (f, resource) in current_form.iter().enumerate() {
        if !form_used[f] {
            merged.push((Some(f), resource.clone()));
        }
    }

    // stable: extras keep their relative order after the form's resources
    merged.sort_by_key(|(f, _)| f.unwrap_or(usize::MAX));
    let mut resources: Vec<Value> = Vec::with_capacity(merged.len());
    for (_, resource) in merged {
        if !resources.contains(&resource) {
            resources.push(resource);
        }
    }

    tracing::debug!(resources = resources.len(), edits = edits.len(), "reconciled form update");
    Reconciled {
        stack: ChangeStack::new(current_form.to_vec(), resources.clone()),
        resources,
        edits,
    }
}

/// Apply the form's movement from `base` to `form` onto `custom`
fn replay(base: &Value, form: &Value, custom: &mut Value, address: &NodePath, edits: &mut [ChangeRecord]) {
    for diff in diff_values(base, form) {
        let full = address.extend(diff.path().segments());
        let edit = edits.iter_mut().find(|e| e.target_path == full);
        match diff {
            Diff::Array { path, .. } => {
                if let Some(array) = get_path(form, path.segments()) {
                    set_path(custom, path.segments(), array.clone());
                }
            }
            Diff::New { path, rhs } => {
                if edit.is_none() {
                    set_path(custom, path.segments(), rhs);
                }
            }
            Diff::Edit { path, rhs, .. } => match edit {
                Some(edit) => edit.prior_value = Some(rhs),
                None => {
                    set_path(custom, path.segments(), rhs);
                }
            },
            Diff::Delete { path, .. } => {
                if edit.is_none() {
                    unset_path(custom, path.segments());
                }
            }
        }
    }
}
