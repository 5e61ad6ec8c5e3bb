//! Position-annotated mirror tree
//!
//! [`Annotated`] parallels a plain [`serde_json::Value`] node for node. The
//! annotation type is generic; the mapper uses [`NodeMeta`] to carry source
//! positions, giving [`MappingNode`].

use crate::path::NodePath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 1-based line/column position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub col: usize,
}

impl SourcePos {
    /// Create position
    #[inline]
    #[must_use]
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Source range; the end column is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// Start position
    pub start: SourcePos,
    /// End position
    pub end: SourcePos,
}

impl SourceRange {
    /// Create range
    #[inline]
    #[must_use]
    pub fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }

    /// Range covering line 1, column 1
    #[inline]
    #[must_use]
    pub fn origin() -> Self {
        Self::single_line(1, 1, 1)
    }

    /// Range within one line
    #[inline]
    #[must_use]
    pub fn single_line(line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start: SourcePos::new(line, start_col),
            end: SourcePos::new(line, end_col),
        }
    }
}

/// Position metadata for one mirror node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Mapping key, or the sequence index as a string
    pub key: String,
    /// Full path from the snapshot root
    pub path: NodePath,
    /// 1-based first line of the node (its key line for mapping entries)
    pub line: usize,
    /// Number of source lines the node spans (at least 1)
    pub length: usize,
    /// Source range of the key token
    pub key_range: Option<SourceRange>,
    /// Source range of the value subtree
    pub value_range: Option<SourceRange>,
    /// Whether the value was redacted as a secret
    pub secret: bool,
    /// Whether the value is syntactically incomplete (`key:` with nothing after it)
    pub incomplete: bool,
}

/// Body of an annotated node
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotatedBody<A> {
    /// Scalar leaf
    Scalar(Value),
    /// Mapping keyed by the same keys as the plain value
    Mapping(IndexMap<String, Annotated<A>>),
    /// Sequence, index-parallel to the source items
    Sequence(Vec<Annotated<A>>),
}

/// Mirror tree node: annotation plus body
#[derive(Debug, Clone, PartialEq)]
pub struct Annotated<A> {
    /// Annotation carried by the node
    pub ann: A,
    /// Node body
    pub body: AnnotatedBody<A>,
}

/// Mirror node produced by the mapper
pub type MappingNode = Annotated<NodeMeta>;

impl<A> Annotated<A> {
    /// Create node
    #[inline]
    #[must_use]
    pub fn new(ann: A, body: AnnotatedBody<A>) -> Self {
        Self { ann, body }
    }

    /// Direct child by key or sequence index
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&Self> {
        match &self.body {
            AnnotatedBody::Mapping(map) => map.get(segment),
            AnnotatedBody::Sequence(items) => items.get(crate::path::as_index(segment)?),
            AnnotatedBody::Scalar(_) => None,
        }
    }

    /// Mutable direct child
    pub fn child_mut(&mut self, segment: &str) -> Option<&mut Self> {
        match &mut self.body {
            AnnotatedBody::Mapping(map) => map.get_mut(segment),
            AnnotatedBody::Sequence(items) => items.get_mut(crate::path::as_index(segment)?),
            AnnotatedBody::Scalar(_) => None,
        }
    }

    /// Descendant at relative segments
    #[must_use]
    pub fn descend<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Self> {
        segments
            .iter()
            .try_fold(self, |node, seg| node.child(seg.as_ref()))
    }

    /// Scalar value if this is a leaf
    #[inline]
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        match &self.body {
            AnnotatedBody::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Child keys of a mapping node
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        match &self.body {
            AnnotatedBody::Mapping(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Visit every node depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        match &self.body {
            AnnotatedBody::Mapping(map) => map.values().for_each(|c| c.walk(visit)),
            AnnotatedBody::Sequence(items) => items.iter().for_each(|c| c.walk(visit)),
            AnnotatedBody::Scalar(_) => {}
        }
    }
}

impl MappingNode {
    /// Whether the node holds a present value
    ///
    /// Collections always count as present; scalars count unless null.
    #[must_use]
    pub fn has_value(&self) -> bool {
        match &self.body {
            AnnotatedBody::Scalar(v) => !v.is_null() && !self.ann.incomplete,
            _ => true,
        }
    }

    /// 1-based first line
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        self.ann.line
    }

    /// Line span
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.ann.length
    }

    /// Full path of the node
    #[inline]
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.ann.path
    }
}
