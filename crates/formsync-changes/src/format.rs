//! Change formatting for display
//!
//! Renders records against the redacted snapshot the user sees, sorts them
//! by line and folds adjacent additions together.

use crate::record::{ChangeKind, ChangeRecord};
use formsync_document::{NodePath, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display form of a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedChange {
    /// Change kind
    pub kind: ChangeKind,
    /// 1-based first line
    pub line: usize,
    /// Line span
    pub length: usize,
    /// Value path
    pub path: NodePath,
    /// Value before the change (edits only)
    pub previous: Option<String>,
    /// Rendered lines after the change
    pub latest: Vec<String>,
}

/// Render and consolidate records
///
/// Records whose value no longer exists in `visible` are skipped; secret
/// edits show the mask as their previous value.
#[must_use]
pub fn format_changes(changes: &[ChangeRecord], visible: &Snapshot) -> Vec<FormattedChange> {
    let mut formatted: Vec<FormattedChange> = changes
        .iter()
        .filter_map(|change| format_one(change, visible))
        .collect();
    formatted.sort_by_key(|c| c.line);
    consolidate(formatted)
}

fn format_one(change: &ChangeRecord, visible: &Snapshot) -> Option<FormattedChange> {
    let value = visible.value_at(&change.diff_path)?;
    let node = visible.node_at(&change.target_path);
    let mut out = FormattedChange {
        kind: change.kind,
        line: node.map_or(1, |n| n.line()),
        length: node.map_or(1, |n| n.length()),
        path: change.diff_path.clone(),
        previous: None,
        latest: Vec::new(),
    };
    match change.kind {
        ChangeKind::New => {
            let key = node.map_or_else(String::new, |n| n.ann.key.clone());
            let mut entry = Map::new();
            entry.insert(key, value.clone());
            out.latest = render_lines(&Value::Object(entry));
        }
        ChangeKind::Edit => {
            let latest = node.and_then(|n| n.scalar()).map(display).unwrap_or_default();
            let secret = node.is_some_and(|n| n.ann.secret);
            out.previous = if secret {
                Some(latest.clone())
            } else {
                change.prior_value.as_ref().map(display)
            };
            out.latest = vec![latest];
        }
        ChangeKind::Delete => {
            out.previous = change.prior_value.as_ref().map(display);
        }
    }
    Some(out)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_lines(value: &Value) -> Vec<String> {
    match formsync_document::stringify_one(value) {
        Ok(text) => text.trim().lines().map(str::to_string).collect(),
        Err(err) => {
            tracing::debug!("change not renderable: {}", err);
            vec![value.to_string()]
        }
    }
}

/// Fold adjacent News and drop Edits inside a preceding New
///
/// A New stays the anchor across later Edits and Deletes; any other anchor
/// is replaced by the next change.
fn consolidate(changes: Vec<FormattedChange>) -> Vec<FormattedChange> {
    let mut out: Vec<FormattedChange> = Vec::with_capacity(changes.len());
    let mut anchor: Option<usize> = None;
    for change in changes {
        if let Some(i) = anchor.filter(|&i| out[i].kind == ChangeKind::New) {
            let last = &mut out[i];
            let last_end = last.line + last.length;
            match change.kind {
                ChangeKind::New => {
                    if last_end == change.line && !change.latest.is_empty() && !last.latest.is_empty() {
                        last.latest.extend(change.latest);
                        last.length += change.length;
                        continue;
                    }
                    anchor = Some(out.len());
                }
                ChangeKind::Edit if change.line < last_end => continue,
                ChangeKind::Edit | ChangeKind::Delete => {}
            }
        } else {
            anchor = Some(out.len());
        }
        out.push(change);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Origin;
    use formsync_document::map;

    fn record(kind: ChangeKind, path: &str, line: usize, length: usize) -> ChangeRecord {
        ChangeRecord::new(kind, path.parse().unwrap(), line, length, Origin::Form)
    }

    #[test]
    fn new_renders_key_and_value() {
        let snapshot = map("kind: A\nspec:\n  x: 1\n  y: 2\n").snapshot;
        let out = format_changes(&[record(ChangeKind::New, "A.0.spec", 2, 3)], &snapshot);
        assert_eq!(out[0].latest, vec!["spec:", "  x: 1", "  y: 2"]);
        assert_eq!(out[0].line, 2);
    }

    #[test]
    fn adjacent_news_fold_and_inner_edits_drop() {
        let snapshot = map("kind: A\na: 1\nb: 2\nc: 3\n").snapshot;
        let out = format_changes(
            &[
                record(ChangeKind::New, "A.0.b", 3, 1),
                record(ChangeKind::New, "A.0.a", 2, 1),
                record(ChangeKind::Edit, "A.0.c", 4, 1),
            ],
            &snapshot,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].latest, vec!["a: 1", "b: 2"]);
        assert_eq!(out[0].length, 2);
        assert_eq!(out[1].kind, ChangeKind::Edit);
    }

    #[test]
    fn vanished_paths_skipped() {
        let snapshot = map("kind: A\n").snapshot;
        let out = format_changes(&[record(ChangeKind::Edit, "A.0.gone", 2, 1)], &snapshot);
        assert!(out.is_empty());
    }

    #[test]
    fn edit_shows_prior() {
        let snapshot = map("kind: A\nx: new\n").snapshot;
        let change = record(ChangeKind::Edit, "A.0.x", 2, 1).with_prior(Some(Value::from("old")));
        let out = format_changes(&[change], &snapshot);
        assert_eq!(out[0].previous.as_deref(), Some("old"));
        assert_eq!(out[0].latest, vec!["new"]);
    }

    #[test]
    fn new_anchor_survives_a_delete() {
        let snapshot = map("kind: A\na: 1\nb: 2\n").snapshot;
        let deleted = record(ChangeKind::Delete, "A.0.b", 3, 1).with_prior(Some(Value::from(0)));
        let out = format_changes(
            &[
                record(ChangeKind::New, "A.0.a", 2, 1),
                deleted,
                record(ChangeKind::New, "A.0.b", 3, 1),
            ],
            &snapshot,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].latest, vec!["a: 1", "b: 2"]);
        assert_eq!(out[1].kind, ChangeKind::Delete);
    }
}
