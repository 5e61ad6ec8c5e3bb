//! Protection & Redaction
//!
//! Hides secrets and filtered subtrees from the rendered buffer and computes
//! the line ranges the user must not edit.
//!
//! # Core Concepts
//!
//! - **Secrets**: string leaves matching a secret pattern render as a run of
//!   `*` no longer than the mask limit; the plain value is cached by path.
//! - **Filters**: matching subtrees are left out of the rendered buffer and
//!   cached by path.
//! - **Restore**: a user edit gets the cached values back wherever the mask is
//!   still in place or the filtered subtree is still absent.
//! - **Protected ranges**: half-open `[start_line, end_line)` spans over
//!   secrets, immutables and identity fields of live resources.
//!
//! # Example
//!
//! ```rust,ignore
//! let rules = ProtectionRules::new(&["Secret.*.data.*"], &[] as &[&str], &[] as &[&str]);
//! let redacted = rules.redact(&yaml, snapshot, &config)?;
//! let ranges = rules.protected_ranges(&redacted.snapshot, &config, line_count(&redacted.yaml));
//! ```

use crate::config::SyncConfig;
use formsync_document::{
    map, parse_patterns, resource_id, stringify, DocumentError, NodePath, PathPattern, Snapshot,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity fields protected on resources that carry `metadata.uid`
pub const UID_SIBLINGS: [&str; 8] = [
    "name",
    "namespace",
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "generation",
    "selfLink",
    "managedFields",
];

/// Half-open line range `[start_line, end_line)`, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtectedRange {
    /// First protected line
    pub start_line: usize,
    /// First line after the range
    pub end_line: usize,
}

impl ProtectedRange {
    /// Create range
    #[inline]
    #[must_use]
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self { start_line, end_line }
    }

    /// Range covering a node span
    #[inline]
    #[must_use]
    pub fn span(line: usize, length: usize) -> Self {
        Self::new(line, line + length.max(1))
    }

    /// Check if a line lies inside
    #[inline]
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..self.end_line).contains(&line)
    }
}

/// Sort and merge overlapping or touching ranges
#[must_use]
pub fn merge_ranges(mut ranges: Vec<ProtectedRange>) -> Vec<ProtectedRange> {
    ranges.sort();
    let mut merged: Vec<ProtectedRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start_line <= last.end_line => {
                last.end_line = last.end_line.max(range.end_line);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Check if any range contains `line`
#[must_use]
pub fn is_protected(ranges: &[ProtectedRange], line: usize) -> bool {
    ranges.iter().any(|r| r.contains(line))
}

/// Number of editor lines of a text
#[must_use]
pub fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}

/// Mask for a secret value
#[must_use]
pub fn mask_for(secret: &str, limit: usize) -> String {
    let visible = secret.strip_suffix('\n').unwrap_or(secret);
    "*".repeat(visible.chars().count().min(limit))
}

/// A hidden secret and the mask shown in its place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenSecret {
    /// Plain value
    pub value: String,
    /// Rendered mask
    pub mask: String,
}

/// Values hidden from the rendered buffer, keyed by full path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedactionCache {
    secrets: IndexMap<NodePath, HiddenSecret>,
    filters: IndexMap<NodePath, Value>,
}

impl RedactionCache {
    /// Check if nothing is hidden
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty() && self.filters.is_empty()
    }

    /// Hidden secrets
    #[inline]
    #[must_use]
    pub fn secrets(&self) -> &IndexMap<NodePath, HiddenSecret> {
        &self.secrets
    }

    /// Hidden subtrees
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &IndexMap<NodePath, Value> {
        &self.filters
    }

    /// Put hidden values back into the plain values of `snapshot`
    ///
    /// The mirror keeps what the text shows. Returns the number of values
    /// restored.
    pub fn restore(&self, snapshot: &mut Snapshot) -> usize {
        let mut restored = 0;
        for (path, hidden) in &self.secrets {
            let masked = snapshot
                .value_at(path)
                .is_some_and(|v| v.as_str() == Some(hidden.mask.as_str()));
            if masked && snapshot.set_value(path, Value::String(hidden.value.clone())) {
                restored += 1;
            }
        }
        for (path, subtree) in &self.filters {
            let parent_present = path
                .parent()
                .is_some_and(|parent| snapshot.value_at(&parent).is_some());
            if snapshot.value_at(path).is_none() && parent_present && snapshot.set_value(path, subtree.clone()) {
                restored += 1;
            }
        }
        self.mark_secrets(snapshot);
        restored
    }

    /// Flag mirror nodes that still show a mask
    pub fn mark_secrets(&self, snapshot: &mut Snapshot) {
        for (path, hidden) in &self.secrets {
            if let Some(node) = snapshot.node_at_mut(path) {
                if node.scalar().and_then(Value::as_str) == Some(hidden.mask.as_str()) {
                    node.ann.secret = true;
                }
            }
        }
    }
}

/// Rendered buffer after redaction
#[derive(Debug, Clone)]
pub struct Redacted {
    /// Text shown to the user
    pub yaml: String,
    /// Snapshot of that text
    pub snapshot: Snapshot,
    /// Values hidden from it
    pub cache: RedactionCache,
}

/// Secret, immutable and filter patterns of a session
#[derive(Debug, Clone, Default)]
pub struct ProtectionRules {
    secrets: Vec<PathPattern>,
    immutables: Vec<PathPattern>,
    filters: Vec<PathPattern>,
}

impl ProtectionRules {
    /// Parse pattern lists; invalid patterns are skipped
    #[must_use]
    pub fn new<S: AsRef<str>>(secrets: &[S], immutables: &[S], filters: &[S]) -> Self {
        Self {
            secrets: parse_patterns(secrets),
            immutables: parse_patterns(immutables),
            filters: parse_patterns(filters),
        }
    }

    /// Check if no pattern is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty() && self.immutables.is_empty() && self.filters.is_empty()
    }

    /// Hide secrets and filtered subtrees of `snapshot`, rendered as `yaml`
    ///
    /// When nothing is hidden the input comes back unchanged; otherwise the
    /// redacted resources are rendered and mapped again so positions match
    /// the text shown.
    ///
    /// # Errors
    /// Returns error if the redacted resources cannot be rendered
    pub fn redact(&self, yaml: &str, snapshot: Snapshot, config: &SyncConfig) -> Result<Redacted, DocumentError> {
        let mut cache = RedactionCache::default();
        let mut working = snapshot.clone();

        if !config.show_secrets {
            for entry in snapshot.paths.matches_any(&self.secrets) {
                let Some(Value::String(secret)) = &entry.value else { continue };
                let mask = mask_for(secret, config.secret_mask_limit);
                if mask.is_empty() {
                    continue;
                }
                if working.set_value(&entry.path, Value::String(mask.clone())) {
                    cache.secrets.insert(
                        entry.path.clone(),
                        HiddenSecret {
                            value: secret.clone(),
                            mask,
                        },
                    );
                }
            }
        }

        if !config.show_filtered {
            // deepest and last first so removals do not shift pending paths
            for entry in snapshot.paths.matches_any(&self.filters).into_iter().rev() {
                if let Some(subtree) = working.unset_value(&entry.path) {
                    cache.filters.insert(entry.path.clone(), subtree);
                }
            }
        }

        if cache.is_empty() {
            return Ok(Redacted {
                yaml: yaml.to_string(),
                snapshot,
                cache,
            });
        }

        let yaml = stringify(&working.resources)?;
        let mut snapshot = map(&yaml).snapshot;
        cache.mark_secrets(&mut snapshot);
        tracing::debug!(
            secrets = cache.secrets.len(),
            filters = cache.filters.len(),
            "redacted buffer"
        );
        Ok(Redacted { yaml, snapshot, cache })
    }

    /// Line ranges of `snapshot` the user may not edit
    #[must_use]
    pub fn protected_ranges(&self, snapshot: &Snapshot, config: &SyncConfig, line_count: usize) -> Vec<ProtectedRange> {
        if config.readonly {
            return vec![ProtectedRange::new(1, line_count + 1)];
        }
        let ranges = self
            .protected_nodes(snapshot, config)
            .into_iter()
            .map(|(_, line, length)| ProtectedRange::span(line, length))
            .collect();
        merge_ranges(ranges)
    }

    /// Put the protected values of `prior` back into `snapshot`
    ///
    /// Documents pair up by `metadata.uid`, then by identity, then by
    /// position within their kind. Only plain values change; the mirror keeps
    /// what was typed. Returns the number of values put back.
    pub fn pin_protected(&self, snapshot: &mut Snapshot, prior: &Snapshot, config: &SyncConfig) -> usize {
        let mut pinned = 0;
        for (path, _, _) in self.protected_nodes(prior, config) {
            let Some((kind, index)) = path.document_address() else { continue };
            let Some(value) = prior.value_at(&path) else { continue };
            let Some(target) = paired_document(prior, snapshot, kind, index) else { continue };
            let target = NodePath::document(kind, target).extend(&path.segments()[2..]);
            if snapshot.value_at(&target) != Some(value) && snapshot.set_value(&target, value.clone()) {
                pinned += 1;
            }
        }
        if pinned > 0 {
            tracing::debug!(pinned, "kept protected values");
        }
        pinned
    }

    /// Secret, immutable and live identity nodes as `(path, line, length)`
    fn protected_nodes(&self, snapshot: &Snapshot, config: &SyncConfig) -> Vec<(NodePath, usize, usize)> {
        let mut nodes: Vec<(NodePath, usize, usize)> = snapshot
            .paths
            .matches_any(&self.secrets)
            .into_iter()
            .filter(|entry| matches!(entry.value, Some(Value::String(_))))
            .chain(snapshot.paths.matches_any(&self.immutables))
            .map(|entry| (entry.path.clone(), entry.line, entry.length))
            .collect();

        if !config.editable_uid_siblings {
            for (kind, index) in snapshot.addresses() {
                let metadata = NodePath::document(kind, *index).child("metadata");
                if snapshot.node_at(&metadata.child("uid")).is_none() {
                    continue;
                }
                nodes.extend(
                    UID_SIBLINGS
                        .iter()
                        .filter_map(|field| snapshot.node_at(&metadata.child(*field)))
                        .map(|node| (node.path().clone(), node.line(), node.length())),
                );
            }
        }
        nodes
    }
}

/// Position within `kind` of the `snapshot` document matching `prior`'s `index`
fn paired_document(prior: &Snapshot, snapshot: &Snapshot, kind: &str, index: usize) -> Option<usize> {
    let before = prior.parsed.get(kind)?.get(index)?;
    let candidates = snapshot.parsed.get(kind)?;
    let uid = |doc: &Value| doc.pointer("/metadata/uid").cloned();
    if let Some(before_uid) = uid(before) {
        if let Some(found) = candidates.iter().position(|doc| uid(doc).as_ref() == Some(&before_uid)) {
            return Some(found);
        }
    }
    if let Some(id) = resource_id(before) {
        if let Some(found) = candidates.iter().position(|doc| resource_id(doc).as_ref() == Some(&id)) {
            return Some(found);
        }
    }
    (index < candidates.len()).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "kind: Secret\nmetadata:\n  name: creds\ndata:\n  token: abcdefghijklmnopqrstuvwxyz\n  user: bob\n";

    fn rules(secrets: &[&str], immutables: &[&str], filters: &[&str]) -> ProtectionRules {
        ProtectionRules {
            secrets: parse_patterns(secrets),
            immutables: parse_patterns(immutables),
            filters: parse_patterns(filters),
        }
    }

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn mask_is_capped_and_ignores_trailing_newline() {
        assert_eq!(mask_for("abc\n", 20), "***");
        assert_eq!(mask_for(&"x".repeat(40), 20).len(), 20);
    }

    #[test]
    fn merge_joins_overlapping_and_touching() {
        let merged = merge_ranges(vec![
            ProtectedRange::new(5, 6),
            ProtectedRange::new(1, 3),
            ProtectedRange::new(3, 4),
            ProtectedRange::new(5, 8),
        ]);
        assert_eq!(merged, vec![ProtectedRange::new(1, 4), ProtectedRange::new(5, 8)]);
    }

    #[test]
    fn secrets_masked_and_cached() {
        let mapped = map(SECRET);
        let redacted = rules(&["Secret.data.token"], &[], &[])
            .redact(SECRET, mapped.snapshot, &SyncConfig::default())
            .unwrap();
        assert!(!redacted.yaml.contains("abcdefghij"));
        assert!(redacted.yaml.contains(&"*".repeat(20)));
        let hidden = &redacted.cache.secrets()[&path("Secret.0.data.token")];
        assert_eq!(hidden.value, "abcdefghijklmnopqrstuvwxyz");
        let node = redacted.snapshot.node_at(&path("Secret.0.data.token")).unwrap();
        assert!(node.ann.secret);
    }

    #[test]
    fn revealed_secrets_pass_through() {
        let mapped = map(SECRET);
        let config = SyncConfig::default().with_show_secrets(true);
        let redacted = rules(&["Secret.data.token"], &[], &[]).redact(SECRET, mapped.snapshot, &config).unwrap();
        assert_eq!(redacted.yaml, SECRET);
        assert!(redacted.cache.is_empty());
    }

    #[test]
    fn restore_puts_secret_back_while_mask_unchanged() {
        let mapped = map(SECRET);
        let redacted = rules(&["Secret.data.token"], &[], &[])
            .redact(SECRET, mapped.snapshot, &SyncConfig::default())
            .unwrap();

        let mut typed = map(&redacted.yaml.replace("user: bob", "user: alice")).snapshot;
        assert_eq!(redacted.cache.restore(&mut typed), 1);
        assert_eq!(typed.resources[0]["data"]["token"], "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(typed.resources[0]["data"]["user"], "alice");

        let mut overwritten = map(&redacted.yaml.replace(&"*".repeat(20), "new")).snapshot;
        assert_eq!(redacted.cache.restore(&mut overwritten), 0);
        assert_eq!(overwritten.resources[0]["data"]["token"], "new");
    }

    #[test]
    fn filters_hidden_and_restored_under_live_parent() {
        let text = "kind: Pod\nmetadata:\n  name: p\n  managedFields:\n    - manager: kubectl\nspec: {}\n";
        let redacted = rules(&[], &[], &["Pod.metadata.managedFields"])
            .redact(text, map(text).snapshot, &SyncConfig::default())
            .unwrap();
        assert!(!redacted.yaml.contains("managedFields"));

        let mut typed = map(&redacted.yaml).snapshot;
        redacted.cache.restore(&mut typed);
        assert_eq!(typed.resources[0]["metadata"]["managedFields"][0]["manager"], "kubectl");

        let mut without_parent = map("kind: Pod\nspec: {}\n").snapshot;
        assert_eq!(redacted.cache.restore(&mut without_parent), 0);
    }

    #[test]
    fn protected_ranges_cover_secrets_immutables_and_uid_siblings() {
        let text = "kind: Secret\nmetadata:\n  name: creds\n  uid: 1234\ndata:\n  token: abc\n  user: bob\n";
        let snapshot = map(text).snapshot;
        let ranges = rules(&["Secret.data.token"], &["Secret.data.user"], &[]).protected_ranges(
            &snapshot,
            &SyncConfig::default(),
            line_count(text),
        );
        assert_eq!(ranges, vec![ProtectedRange::new(3, 5), ProtectedRange::new(6, 8)]);

        let editable = SyncConfig::default().with_editable_uid_siblings(true);
        let ranges = rules(&[], &[], &[]).protected_ranges(&snapshot, &editable, line_count(text));
        assert!(ranges.is_empty());
    }

    #[test]
    fn readonly_protects_everything() {
        let snapshot = map(SECRET).snapshot;
        let config = SyncConfig::default().with_readonly(true);
        let ranges = rules(&[], &[], &[]).protected_ranges(&snapshot, &config, line_count(SECRET));
        assert_eq!(ranges, vec![ProtectedRange::new(1, 7)]);
        assert!(is_protected(&ranges, 6));
    }

    #[test]
    fn pinning_restores_live_identity_and_immutables() {
        let before = "kind: Policy\nmetadata:\n  name: p\n  uid: u1\nspec:\n  disabled: false\n  severity: low\n";
        let after = "kind: Policy\nmetadata:\n  name: q\n  uid: u1\nspec:\n  severity: high\n";
        let prior = map(before).snapshot;
        let mut typed = map(after).snapshot;
        let pinned = rules(&[], &["Policy.spec.disabled"], &[]).pin_protected(&mut typed, &prior, &SyncConfig::default());
        assert_eq!(pinned, 2);
        assert_eq!(typed.resources[0]["metadata"]["name"], "p");
        assert_eq!(typed.resources[0]["spec"]["disabled"], false);
        assert_eq!(typed.resources[0]["spec"]["severity"], "high");
    }

    #[test]
    fn pinning_follows_uid_when_documents_move() {
        let prior = map("kind: A\nmetadata:\n  name: a\n  uid: u1\n").snapshot;
        let mut typed = map("kind: A\nmetadata:\n  name: new\n---\nkind: A\nmetadata:\n  name: b\n  uid: u1\n").snapshot;
        rules(&[], &[], &[]).pin_protected(&mut typed, &prior, &SyncConfig::default());
        assert_eq!(typed.resources[0]["metadata"]["name"], "new");
        assert_eq!(typed.resources[1]["metadata"]["name"], "a");
    }
}
