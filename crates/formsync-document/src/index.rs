//! Path Index with radix tree
//!
//! Provides [`PathIndex`], the flattened view of a snapshot's mirror trees.
//! Entries are keyed by path in a radix trie, which gives exact lookups,
//! subtree iteration and pattern queries seeded from a literal prefix.

use crate::annotated::MappingNode;
use crate::path::NodePath;
use crate::pattern::PathPattern;
use radix_trie::{Trie, TrieCommon};
use serde_json::Value;

/// Flattened mirror node
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Full path
    pub path: NodePath,
    /// 1-based first line
    pub line: usize,
    /// Line span
    pub length: usize,
    /// Scalar value, `None` for collections and incomplete nodes
    pub value: Option<Value>,
    /// Parent path (`None` for kind buckets)
    pub parent_path: Option<NodePath>,
}

/// Path index over every node of a snapshot
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    trie: Trie<String, IndexEntry>,
}

impl PathIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { trie: Trie::new() }
    }

    /// Index every node of a document mirror tree
    pub fn insert_document(&mut self, root: &MappingNode) {
        root.walk(&mut |node| {
            let value = if node.ann.incomplete {
                None
            } else {
                node.scalar().cloned()
            };
            self.trie.insert(
                node.ann.path.to_trie_key(),
                IndexEntry {
                    path: node.ann.path.clone(),
                    line: node.ann.line,
                    length: node.ann.length,
                    value,
                    parent_path: node.ann.path.parent(),
                },
            );
        });
    }

    /// Number of indexed paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Exact entry lookup
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&IndexEntry> {
        self.trie.get(&path.to_trie_key())
    }

    /// Every entry at or below `path`
    #[must_use]
    pub fn descendants(&self, path: &NodePath) -> Vec<&IndexEntry> {
        let key = path.to_trie_key();
        if path.is_empty() {
            return self.trie.values().collect();
        }
        // Raw descendant tries may hold keys that only share part of the prefix
        self.trie
            .get_raw_descendant(&key)
            .map(|sub| {
                sub.iter()
                    .filter(|(k, _)| k.starts_with(&key))
                    .map(|(_, v)| v)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entries matching a pattern, in path order
    #[must_use]
    pub fn matches(&self, pattern: &PathPattern) -> Vec<&IndexEntry> {
        let mut found: Vec<&IndexEntry> = self
            .descendants(&pattern.literal_prefix())
            .into_iter()
            .filter(|entry| pattern.matches(&entry.path))
            .collect();
        found.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.path.cmp(&b.path)));
        found
    }

    /// Entries matching any of the patterns, deduplicated
    #[must_use]
    pub fn matches_any(&self, patterns: &[PathPattern]) -> Vec<&IndexEntry> {
        let mut found: Vec<&IndexEntry> = Vec::new();
        for pattern in patterns {
            for entry in self.matches(pattern) {
                if !found.iter().any(|e| e.path == entry.path) {
                    found.push(entry);
                }
            }
        }
        found
    }
}
