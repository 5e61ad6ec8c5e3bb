//! Kind-bucketed snapshot of mapped documents

use crate::annotated::{MappingNode, NodeMeta};
use crate::index::PathIndex;
use crate::mapper::{repath_body, ParsedDocument};
use crate::path::NodePath;
use crate::value::{get_path, set_path, unset_path};
use indexmap::IndexMap;
use serde_json::Value;

/// Bucket used for documents without a `kind`
pub const ROOT_BUCKET: &str = "root";

/// Comparison map: kind bucket to its documents, in source order
pub type Comparison = IndexMap<String, Vec<Value>>;

/// All documents of one text, bucketed by kind
///
/// `parsed` and `mappings` are index-parallel within each bucket; node paths
/// start with `[kind, position]`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Plain values per kind
    pub parsed: IndexMap<String, Vec<Value>>,
    /// Mirror trees per kind
    pub mappings: IndexMap<String, Vec<MappingNode>>,
    /// Plain values in document order
    pub resources: Vec<Value>,
    /// Flattened mirror index
    pub paths: PathIndex,
    addresses: Vec<(String, usize)>,
}

impl Snapshot {
    /// Bucket parsed documents by kind
    #[must_use]
    pub fn from_documents(documents: Vec<ParsedDocument>) -> Self {
        let mut snapshot = Self::default();
        for doc in documents {
            let kind = bucket_for(&doc.value);
            let index = snapshot.parsed.get(&kind).map_or(0, Vec::len);
            let base = NodePath::document(&kind, index);
            let mut body = doc.mirror.body;
            repath_body(&mut body, &base);
            let mirror = MappingNode::new(
                NodeMeta {
                    key: index.to_string(),
                    path: base,
                    ..doc.mirror.ann
                },
                body,
            );
            snapshot.paths.insert_document(&mirror);
            snapshot.parsed.entry(kind.clone()).or_default().push(doc.value.clone());
            snapshot.mappings.entry(kind.clone()).or_default().push(mirror);
            snapshot.resources.push(doc.value);
            snapshot.addresses.push((kind, index));
        }
        snapshot
    }

    /// Whether no document was mapped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Kind bucket and position of each resource, in document order
    #[inline]
    #[must_use]
    pub fn addresses(&self) -> &[(String, usize)] {
        &self.addresses
    }

    /// Document order position of a bucketed document
    #[must_use]
    pub fn resource_index(&self, kind: &str, index: usize) -> Option<usize> {
        self.addresses
            .iter()
            .position(|(k, i)| k == kind && *i == index)
    }

    /// Comparison map used by the change classifier
    #[inline]
    #[must_use]
    pub fn comparison(&self) -> Comparison {
        self.parsed.clone()
    }

    /// Mirror node at a full path
    #[must_use]
    pub fn node_at(&self, path: &NodePath) -> Option<&MappingNode> {
        let (kind, index) = path.document_address()?;
        let root = self.mappings.get(kind)?.get(index)?;
        root.descend(&path.segments()[2..])
    }

    /// Mutable mirror node at a full path
    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut MappingNode> {
        let (kind, index) = path.document_address()?;
        let mut node = self.mappings.get_mut(kind)?.get_mut(index)?;
        for seg in &path.segments()[2..] {
            node = node.child_mut(seg)?;
        }
        Some(node)
    }

    /// Plain value at a full path
    #[must_use]
    pub fn value_at(&self, path: &NodePath) -> Option<&Value> {
        let (kind, index) = path.document_address()?;
        get_path(self.parsed.get(kind)?.get(index)?, &path.segments()[2..])
    }

    /// Replace the plain value at a full path in both `parsed` and `resources`
    pub fn set_value(&mut self, path: &NodePath, value: Value) -> bool {
        let Some((kind, index)) = path.document_address() else {
            return false;
        };
        let rest = &path.segments()[2..];
        let Some(doc) = self.parsed.get_mut(kind).and_then(|b| b.get_mut(index)) else {
            return false;
        };
        if !set_path(doc, rest, value.clone()) {
            return false;
        }
        if let Some(pos) = self.resource_index(kind, index) {
            set_path(&mut self.resources[pos], rest, value);
        }
        true
    }

    /// Remove the plain value at a full path from `parsed` and `resources`
    pub fn unset_value(&mut self, path: &NodePath) -> Option<Value> {
        let (kind, index) = path.document_address()?;
        let rest = &path.segments()[2..];
        let removed = unset_path(self.parsed.get_mut(kind)?.get_mut(index)?, rest)?;
        if let Some(pos) = self.resource_index(kind, index) {
            unset_path(&mut self.resources[pos], rest);
        }
        Some(removed)
    }
}

/// Kind bucket of a document: its `kind` string, else [`ROOT_BUCKET`]
#[must_use]
pub fn bucket_for(value: &Value) -> String {
    value
        .get("kind")
        .and_then(Value::as_str)
        .map_or_else(|| ROOT_BUCKET.to_string(), ToString::to_string)
}
