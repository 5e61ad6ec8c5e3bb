//! Change Classifier
//!
//! Turns structural diffs between two snapshots into positioned
//! [`ChangeRecord`]s and merges them with pending user edits.
//!
//! # Core Concepts
//!
//! - **Positions**: additions and edits are positioned in the newer snapshot,
//!   deletions in the older one.
//! - **Reclassification**: a multi-line edit reads as added lines; an array
//!   insertion reads as a new item; an array deletion silences the positional
//!   edits it causes among the remaining items.
//! - **Pending edits**: user records survive form updates until the form
//!   catches up with them or their node disappears.
//!
//! # Example
//!
//! ```rust,ignore
//! let records = classify(Side::new(&new, &new_cmp), Side::new(&prior, &prior_cmp), Origin::Form);
//! for record in records {
//!     println!("{} {} at line {}", record.kind, record.diff_path, record.line);
//! }
//! ```

use crate::diff::{diff_comparisons, Diff};
use crate::normalize::normalize;
use crate::record::{ChangeKind, ChangeRecord, Origin};
use formsync_document::{Comparison, MappingNode, NodePath, Snapshot};
use indexmap::IndexMap;
use serde_json::Value;

/// A snapshot with the comparison map it was produced from
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
    /// Mapped snapshot (positions)
    pub snapshot: &'a Snapshot,
    /// Comparison map (values)
    pub comparison: &'a Comparison,
}

impl<'a> Side<'a> {
    /// Pair a snapshot with its comparison
    #[inline]
    #[must_use]
    pub fn new(snapshot: &'a Snapshot, comparison: &'a Comparison) -> Self {
        Self { snapshot, comparison }
    }
}

/// Result of classifying a form update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormChanges {
    /// Form changes with the surviving user edits layered on top
    pub changes: Vec<ChangeRecord>,
    /// User edits still pending after this update
    pub remaining_edits: Vec<ChangeRecord>,
}

fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Classify the differences between `prior` and `new`
///
/// Returns no records when the prior snapshot is empty.
#[must_use]
pub fn classify(new: Side<'_>, prior: Side<'_>, origin: Origin) -> Vec<ChangeRecord> {
    if prior.snapshot.is_empty() {
        return Vec::new();
    }
    let mut prior_cmp = prior.comparison.clone();
    let mut new_cmp = new.comparison.clone();
    normalize(&mut prior_cmp, &mut new_cmp);

    let mut suppressed: Vec<NodePath> = Vec::new();
    let mut records = Vec::new();
    for diff in diff_comparisons(&prior_cmp, &new_cmp) {
        if diff.path().is_empty() {
            continue;
        }
        if let [bucket] = diff.path().segments() {
            records.extend(document_records(&diff, bucket, new.snapshot, prior.snapshot, origin));
            continue;
        }
        if let Some(record) = classify_one(&diff, new.snapshot, prior.snapshot, origin, &mut suppressed) {
            records.push(record);
        }
    }
    tracing::debug!(?origin, records = records.len(), "classified changes");
    records
}

/// Records for whole documents added to or removed from a kind bucket
fn document_records(diff: &Diff, bucket: &str, new: &Snapshot, prior: &Snapshot, origin: Origin) -> Vec<ChangeRecord> {
    let (kind, only) = match diff {
        Diff::New { .. } => (ChangeKind::New, None),
        Diff::Delete { .. } => (ChangeKind::Delete, None),
        Diff::Array { index, item, .. } => match **item {
            Diff::New { .. } => (ChangeKind::New, Some(*index)),
            Diff::Delete { .. } => (ChangeKind::Delete, Some(*index)),
            _ => return Vec::new(),
        },
        Diff::Edit { .. } => return Vec::new(),
    };
    let synced = if kind == ChangeKind::Delete { prior } else { new };
    let user = origin == Origin::User;
    synced
        .mappings
        .get(bucket)
        .into_iter()
        .flatten()
        .enumerate()
        .filter(|(i, _)| only.map_or(true, |o| o == *i))
        .map(|(_, root)| {
            let prior_value = (user && kind == ChangeKind::Delete)
                .then(|| prior.value_at(root.path()).cloned())
                .flatten();
            ChangeRecord::new(kind, root.path().clone(), root.line(), root.length(), origin).with_prior(prior_value)
        })
        .collect()
}

fn classify_one(
    diff: &Diff,
    new: &Snapshot,
    prior: &Snapshot,
    origin: Origin,
    suppressed: &mut Vec<NodePath>,
) -> Option<ChangeRecord> {
    let removal = matches!(diff, Diff::Edit { .. } | Diff::Delete { .. })
        && diff.lhs().is_some()
        && is_falsy(diff.rhs());
    let synced = if removal { prior } else { new };
    let mut path = diff.path().clone();
    let mut node: &MappingNode = synced.node_at(&path)?;
    let mut kind = match diff {
        Diff::New { .. } => Some(ChangeKind::New),
        Diff::Edit { .. } => Some(ChangeKind::Edit),
        Diff::Delete { .. } => Some(ChangeKind::Delete),
        Diff::Array { .. } => None,
    };
    let (mut line, mut length) = (node.line(), node.length());

    if node.has_value() {
        match diff {
            Diff::Edit { .. } if node.length() > 1 && !is_falsy(diff.rhs()) => {
                kind = Some(ChangeKind::New);
                line += 1;
                length -= 1;
            }
            Diff::Array { index, item, .. } => match **item {
                Diff::New { .. } => {
                    kind = Some(ChangeKind::New);
                    if let Some(inserted) = node.child(&index.to_string()) {
                        node = inserted;
                        path = node.path().clone();
                        line = node.line();
                        length = node.length();
                    }
                }
                _ => suppressed.push(path.clone()),
            },
            _ => {}
        }
    } else if node.length() > 1 && kind != Some(ChangeKind::Delete) {
        kind = Some(ChangeKind::New);
        path = path.parent()?;
        node = new.node_at(&path)?;
        line = node.line();
        length = node.length();
    }

    if suppressed.iter().any(|p| p.is_prefix_of(&path)) {
        return None;
    }

    let user = origin == Origin::User;
    match kind? {
        ChangeKind::Edit => {
            if !node.has_value() || diff.rhs().is_none() {
                return None;
            }
            Some(
                ChangeRecord::new(ChangeKind::Edit, path, line, length, origin)
                    .with_prior(user.then(|| diff.lhs().cloned()).flatten()),
            )
        }
        ChangeKind::New => Some(ChangeRecord::new(ChangeKind::New, path, line, length, origin)),
        ChangeKind::Delete => Some(
            ChangeRecord::new(ChangeKind::Delete, path, line, length, origin)
                .with_prior(user.then(|| diff.lhs().cloned()).flatten()),
        ),
    }
}

/// Whether the node at an edit's target still holds the edit's prior value
fn holds_prior(snapshot: &Snapshot, edit: &ChangeRecord) -> Option<bool> {
    let node = snapshot.node_at(&edit.target_path)?;
    Some(edit.prior_value.is_some() && node.scalar() == edit.prior_value.as_ref())
}

/// Classify a form update and settle pending user edits against it
///
/// `new` is the reconciled snapshot paired with the raw form comparison;
/// without a prior form snapshot the pending edits pass through unchanged.
#[must_use]
pub fn form_changes(new: Side<'_>, prior: Option<Side<'_>>, pending: &[ChangeRecord]) -> FormChanges {
    let Some(prior) = prior else {
        return FormChanges {
            changes: pending.to_vec(),
            remaining_edits: pending.to_vec(),
        };
    };
    let mut by_path: IndexMap<NodePath, ChangeRecord> = classify(new, prior, Origin::Form)
        .into_iter()
        .map(|record| (record.diff_path.clone(), record))
        .collect();

    let mut remaining = Vec::new();
    for edit in pending {
        let Some(node) = new.snapshot.node_at(&edit.target_path) else {
            continue;
        };
        let form_value = new_form_value(new.comparison, &edit.diff_path);
        if form_value.is_some() && form_value == node.scalar() {
            // the form now says what the user typed
            continue;
        }
        by_path.shift_remove(&edit.diff_path);
        remaining.push(edit.clone());
    }

    let mut changes: Vec<ChangeRecord> = by_path.into_values().collect();
    changes.extend(remaining.iter().cloned());
    FormChanges {
        changes,
        remaining_edits: remaining,
    }
}

fn new_form_value<'a>(comparison: &'a Comparison, path: &NodePath) -> Option<&'a Value> {
    let (kind, index) = path.document_address()?;
    formsync_document::get_path(comparison.get(kind)?.get(index)?, &path.segments()[2..])
}

/// Classify a user edit against the last form-produced snapshot
///
/// Older pending edits are merged in: one whose node vanished is dropped;
/// one whose path holds its prior value again is dropped together with the
/// newest record at that path; when the newest record touches the same path
/// it inherits the older prior value; otherwise the older edit is kept.
#[must_use]
pub fn user_changes(new: Side<'_>, last_form: Option<Side<'_>>, pending: &[ChangeRecord]) -> Vec<ChangeRecord> {
    let Some(last_form) = last_form else {
        return pending.to_vec();
    };
    let newest = classify(new, last_form, Origin::User);
    if pending.is_empty() {
        return newest;
    }
    let mut by_path: IndexMap<NodePath, ChangeRecord> = newest
        .into_iter()
        .map(|record| (record.diff_path.clone(), record))
        .collect();
    for old in pending {
        let Some(reverted) = holds_prior(new.snapshot, old) else {
            continue;
        };
        if reverted {
            by_path.shift_remove(&old.diff_path);
        } else if let Some(record) = by_path.get_mut(&old.diff_path) {
            record.prior_value.clone_from(&old.prior_value);
        } else {
            by_path.insert(old.diff_path.clone(), old.clone());
        }
    }
    by_path.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsync_document::map;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn mapped(text: &str) -> (Snapshot, Comparison) {
        let snapshot = map(text).snapshot;
        let comparison = snapshot.comparison();
        (snapshot, comparison)
    }

    fn run(before: &str, after: &str, origin: Origin) -> Vec<ChangeRecord> {
        let (prior, prior_cmp) = mapped(before);
        let (new, new_cmp) = mapped(after);
        classify(Side::new(&new, &new_cmp), Side::new(&prior, &prior_cmp), origin)
    }

    const BASE: &str = "kind: Policy\nmetadata:\n  name: p\nspec:\n  severity: low\n  items:\n    - a\n    - b\n";

    #[test]
    fn scalar_edit_positioned_in_new() {
        let records = run(BASE, &BASE.replace("low", "high"), Origin::Form);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Edit);
        assert_eq!(records[0].diff_path.to_string(), "Policy.0.spec.severity");
        assert_eq!((records[0].line, records[0].length), (5, 1));
        assert_eq!(records[0].prior_value, None);
    }

    #[test]
    fn user_edit_remembers_prior() {
        let records = run(BASE, &BASE.replace("low", "high"), Origin::User);
        assert_eq!(records[0].prior_value, Some(json!("low")));
    }

    #[test]
    fn new_key_is_new_record() {
        let after = format!("{BASE}  extra:\n    x: 1\n    y: 2\n");
        let records = run(BASE, &after, Origin::Form);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::New);
        assert_eq!((records[0].line, records[0].length), (9, 3));
    }

    #[test]
    fn array_insertion_positions_item() {
        let after = format!("{BASE}    - c\n");
        let records = run(BASE, &after, Origin::Form);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::New);
        assert_eq!(records[0].target_path.to_string(), "Policy.0.spec.items.2");
        assert_eq!(records[0].line, 9);
    }

    #[test]
    fn array_deletion_suppresses_shifted_items() {
        let after = BASE.replace("    - a\n", "");
        let records = run(BASE, &after, Origin::Form);
        assert!(records.is_empty(), "unexpected {records:?}");
    }

    #[test]
    fn deleted_key_positioned_in_prior() {
        let after = BASE.replace("  severity: low\n", "");
        let records = run(BASE, &after, Origin::User);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Delete);
        assert_eq!(records[0].line, 5);
        assert_eq!(records[0].prior_value, Some(json!("low")));
    }

    #[test]
    fn multi_line_edit_becomes_new() {
        let before = "kind: A\ndata: |\n  one\n";
        let after = "kind: A\ndata: |\n  one\n  two\n";
        let records = run(before, after, Origin::Form);
        assert_eq!(records[0].kind, ChangeKind::New);
        assert_eq!((records[0].line, records[0].length), (3, 2));
    }

    #[test]
    fn document_of_new_kind_is_new_record() {
        let after = format!("{BASE}---\nkind: Placement\nmetadata:\n  name: pl\n");
        let records = run(BASE, &after, Origin::Form);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::New);
        assert_eq!(records[0].target_path.to_string(), "Placement.0");
        assert_eq!(records[0].line, 10);
    }

    #[test]
    fn removed_kind_is_delete_in_prior() {
        let before = format!("{BASE}---\nkind: Placement\nmetadata:\n  name: pl\n");
        let records = run(&before, BASE, Origin::User);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::Delete);
        assert_eq!(records[0].line, 10);
        assert_eq!(records[0].prior_value.as_ref().unwrap()["kind"], "Placement");
    }

    #[test]
    fn empty_prior_yields_nothing() {
        assert!(run("", BASE, Origin::Form).is_empty());
    }

    fn user_edit(path: &str, prior: Value, line: usize) -> ChangeRecord {
        ChangeRecord::new(ChangeKind::Edit, path.parse().unwrap(), line, 1, Origin::User)
            .with_prior(Some(prior))
    }

    #[test]
    fn form_change_at_edit_path_is_hidden_by_edit() {
        // the user typed "mine", the form then moved severity from low to high
        let (prior, prior_cmp) = mapped(BASE);
        let form_text = BASE.replace("low", "high");
        let (_, form_cmp) = mapped(&form_text);
        let (reconciled, _) = mapped(&BASE.replace("low", "mine"));
        let edit = user_edit("Policy.0.spec.severity", json!("low"), 5);
        let out = form_changes(
            Side::new(&reconciled, &form_cmp),
            Some(Side::new(&prior, &prior_cmp)),
            &[edit.clone()],
        );
        assert_eq!(out.remaining_edits, vec![edit.clone()]);
        assert_eq!(out.changes, vec![edit]);
    }

    #[test]
    fn edit_dropped_once_form_matches() {
        let (prior, prior_cmp) = mapped(BASE);
        let text = BASE.replace("low", "mine");
        let (reconciled, form_cmp) = mapped(&text);
        let edit = user_edit("Policy.0.spec.severity", json!("low"), 5);
        let out = form_changes(
            Side::new(&reconciled, &form_cmp),
            Some(Side::new(&prior, &prior_cmp)),
            &[edit],
        );
        assert!(out.remaining_edits.is_empty());
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].origin, Origin::Form);
    }

    #[test]
    fn edit_dropped_when_node_vanishes() {
        let (prior, prior_cmp) = mapped(BASE);
        let text = BASE.replace("  severity: low\n", "");
        let (reconciled, form_cmp) = mapped(&text);
        let edit = user_edit("Policy.0.spec.severity", json!("low"), 5);
        let out = form_changes(
            Side::new(&reconciled, &form_cmp),
            Some(Side::new(&prior, &prior_cmp)),
            &[edit],
        );
        assert!(out.remaining_edits.is_empty());
    }

    #[test]
    fn user_changes_keep_older_prior_at_same_path() {
        let (last_form, last_cmp) = mapped(&BASE.replace("low", "mine"));
        let (typed, typed_cmp) = mapped(&BASE.replace("low", "mine2"));
        let old = user_edit("Policy.0.spec.severity", json!("low"), 5);
        let merged = user_changes(
            Side::new(&typed, &typed_cmp),
            Some(Side::new(&last_form, &last_cmp)),
            &[old],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].prior_value, Some(json!("low")));
    }

    #[test]
    fn user_changes_drop_reverted_edit() {
        let (last_form, last_cmp) = mapped(&BASE.replace("low", "mine"));
        let (typed, typed_cmp) = mapped(BASE);
        let old = user_edit("Policy.0.spec.severity", json!("low"), 5);
        let merged = user_changes(
            Side::new(&typed, &typed_cmp),
            Some(Side::new(&last_form, &last_cmp)),
            &[old],
        );
        assert!(merged.is_empty());
    }

    #[test]
    fn user_changes_keep_unrelated_old_edit() {
        let text = BASE.replace("name: p", "name: q");
        let (last_form, last_cmp) = mapped(&text);
        let (typed, typed_cmp) = mapped(&text.replace("low", "other"));
        let old = user_edit("Policy.0.metadata.name", json!("p"), 3);
        let merged = user_changes(
            Side::new(&typed, &typed_cmp),
            Some(Side::new(&last_form, &last_cmp)),
            &[old.clone()],
        );
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&old));
    }
}
