//! Structural diff over value trees
//!
//! Produces the four-way taxonomy used by the classifier: a key or item that
//! appeared ([`Diff::New`]), a value that changed ([`Diff::Edit`]), a key that
//! disappeared ([`Diff::Delete`]) and an array whose length changed
//! ([`Diff::Array`], carrying the per-item New or Delete).
//!
//! Ordering within an array: removed tail items first (last to first), then
//! added tail items, then the shared prefix recursively.

use formsync_document::{Comparison, NodePath};
use serde_json::Value;

/// One structural difference
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Value present only on the right
    New {
        /// Where
        path: NodePath,
        /// New value
        rhs: Value,
    },
    /// Value changed
    Edit {
        /// Where
        path: NodePath,
        /// Previous value
        lhs: Value,
        /// New value
        rhs: Value,
    },
    /// Value present only on the left
    Delete {
        /// Where
        path: NodePath,
        /// Removed value
        lhs: Value,
    },
    /// Array item added or removed at the tail
    Array {
        /// Path of the array
        path: NodePath,
        /// Item index
        index: usize,
        /// Item change, always [`Diff::New`] or [`Diff::Delete`] with an empty path
        item: Box<Diff>,
    },
}

impl Diff {
    /// Path of the diff
    #[inline]
    #[must_use]
    pub fn path(&self) -> &NodePath {
        match self {
            Self::New { path, .. }
            | Self::Edit { path, .. }
            | Self::Delete { path, .. }
            | Self::Array { path, .. } => path,
        }
    }

    /// Left-hand value, if any
    #[must_use]
    pub fn lhs(&self) -> Option<&Value> {
        match self {
            Self::Edit { lhs, .. } | Self::Delete { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    /// Right-hand value, if any
    #[must_use]
    pub fn rhs(&self) -> Option<&Value> {
        match self {
            Self::New { rhs, .. } | Self::Edit { rhs, .. } => Some(rhs),
            _ => None,
        }
    }
}

/// Diff two values
#[must_use]
pub fn diff_values(lhs: &Value, rhs: &Value) -> Vec<Diff> {
    let mut out = Vec::new();
    walk(&NodePath::root(), lhs, rhs, &mut out);
    out
}

/// Diff two comparison maps as objects of arrays
#[must_use]
pub fn diff_comparisons(lhs: &Comparison, rhs: &Comparison) -> Vec<Diff> {
    diff_values(&comparison_value(lhs), &comparison_value(rhs))
}

fn comparison_value(cmp: &Comparison) -> Value {
    Value::Object(
        cmp.iter()
            .map(|(kind, docs)| (kind.clone(), Value::Array(docs.clone())))
            .collect(),
    )
}

fn walk(path: &NodePath, lhs: &Value, rhs: &Value, out: &mut Vec<Diff>) {
    match (lhs, rhs) {
        (Value::Object(left), Value::Object(right)) => {
            for (key, l) in left {
                match right.get(key) {
                    Some(r) => walk(&path.child(key.clone()), l, r, out),
                    None => out.push(Diff::Delete {
                        path: path.child(key.clone()),
                        lhs: l.clone(),
                    }),
                }
            }
            for (key, r) in right {
                if !left.contains_key(key) {
                    out.push(Diff::New {
                        path: path.child(key.clone()),
                        rhs: r.clone(),
                    });
                }
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            for index in (right.len()..left.len()).rev() {
                out.push(Diff::Array {
                    path: path.clone(),
                    index,
                    item: Box::new(Diff::Delete {
                        path: NodePath::root(),
                        lhs: left[index].clone(),
                    }),
                });
            }
            for (index, item) in right.iter().enumerate().skip(left.len()) {
                out.push(Diff::Array {
                    path: path.clone(),
                    index,
                    item: Box::new(Diff::New {
                        path: NodePath::root(),
                        rhs: item.clone(),
                    }),
                });
            }
            for (index, (l, r)) in left.iter().zip(right).enumerate() {
                walk(&path.child(index.to_string()), l, r, out);
            }
        }
        (l, r) if l != r => out.push(Diff::Edit {
            path: path.clone(),
            lhs: l.clone(),
            rhs: r.clone(),
        }),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn p(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn object_keys_new_edit_delete() {
        let diffs = diff_values(&json!({"a": 1, "b": 2}), &json!({"a": 3, "c": 4}));
        assert_eq!(
            diffs,
            vec![
                Diff::Edit { path: p("a"), lhs: json!(1), rhs: json!(3) },
                Diff::Delete { path: p("b"), lhs: json!(2) },
                Diff::New { path: p("c"), rhs: json!(4) },
            ]
        );
    }

    #[test]
    fn array_tail_changes_come_first() {
        let diffs = diff_values(&json!({"l": [1, 2, 3]}), &json!({"l": [9]}));
        assert_eq!(diffs.len(), 3);
        assert!(matches!(&diffs[0], Diff::Array { index: 2, item, .. } if matches!(**item, Diff::Delete { .. })));
        assert!(matches!(&diffs[1], Diff::Array { index: 1, .. }));
        assert_eq!(diffs[2], Diff::Edit { path: p("l.0"), lhs: json!(1), rhs: json!(9) });
    }

    #[test]
    fn type_change_is_edit() {
        let diffs = diff_values(&json!({"a": {"x": 1}}), &json!({"a": "s"}));
        assert_eq!(diffs, vec![Diff::Edit { path: p("a"), lhs: json!({"x": 1}), rhs: json!("s") }]);
    }

    #[test]
    fn comparisons_diff_by_kind_and_position() {
        let mut before = Comparison::new();
        before.insert("A".into(), vec![json!({"x": 1})]);
        let mut after = before.clone();
        after.insert("A".into(), vec![json!({"x": 2})]);
        let diffs = diff_comparisons(&before, &after);
        assert_eq!(diffs[0].path().to_string(), "A.0.x");
    }
}
