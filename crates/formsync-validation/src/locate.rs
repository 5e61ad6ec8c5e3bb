//! Source positioning of validation findings

use formsync_document::{best_match, MappingNode, NodePath, Snapshot, SourceRange};

/// How a finding is underlined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Missing property: underline a similarly spelled sibling key, if any
    MissingProperty(String),
    /// Underline the value
    Value,
}

/// Similarity a sibling key needs to be taken for a misspelling
const MISSPELLING_THRESHOLD: f64 = 0.7;

/// Position of a finding at `instance_path` inside the document at `prefix`
///
/// Paths that do not exist in the mirror fall back to their nearest existing
/// ancestor; the document root falls back to its `kind` line.
#[must_use]
pub fn locate(snapshot: &Snapshot, prefix: &NodePath, instance_path: &[String], anchor: &Anchor) -> SourceRange {
    let Some(root) = snapshot.node_at(prefix) else {
        return SourceRange::origin();
    };
    let mut depth = instance_path.len();
    let node = loop {
        if let Some(node) = root.descend(&instance_path[..depth]) {
            break node;
        }
        depth -= 1;
    };

    let line = if depth == 0 {
        root.child("kind").map_or(root.line(), MappingNode::line)
    } else {
        node.line()
    };

    match anchor {
        Anchor::MissingProperty(property) => {
            let keys = node.keys();
            if let Some((i, rating)) = best_match(property, keys.iter().copied()) {
                if rating > MISSPELLING_THRESHOLD {
                    if let Some(range) = node.child(keys[i]).and_then(|sibling| sibling.ann.key_range) {
                        return range;
                    }
                }
            }
            SourceRange::single_line(line, 1, 1)
        }
        Anchor::Value => {
            let target = if depth == 0 { root.child("kind").unwrap_or(root) } else { node };
            target.ann.value_range.map_or_else(
                || SourceRange::single_line(line, 1, 1),
                |range| SourceRange::single_line(line, range.start.col, range.end.col),
            )
        }
    }
}
