//! Node paths for addressing values inside mapped documents
//!
//! Provides [`NodePath`] for hierarchical addressing of values and mirror
//! nodes. The first two segments of a snapshot path are the kind bucket and
//! the document's position inside it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator used for radix trie keys
///
/// YAML keys may legitimately contain dots or slashes, so trie keys use a
/// control character that cannot appear in a plain key.
pub(crate) const TRIE_SEPARATOR: char = '\u{1f}';

/// Path within a mapped document tree
///
/// Segments are strings; numeric segments address sequence indices.
///
/// # Examples
/// - `["Policy", "0", "metadata", "name"]` → `Policy.0.metadata.name`
/// - `a[0].b` parses to `["a", "0", "b"]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path addressing one document of a kind bucket
    #[inline]
    #[must_use]
    pub fn document(kind: &str, index: usize) -> Self {
        Self(vec![kind.to_string(), index.to_string()])
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Extend with multiple segments
    #[inline]
    #[must_use]
    pub fn extend(&self, segments: &[impl AsRef<str>]) -> Self {
        let mut new = self.clone();
        for seg in segments {
            new.0.push(seg.as_ref().to_string());
        }
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Kind bucket and document position, when the path has both
    #[must_use]
    pub fn document_address(&self) -> Option<(&str, usize)> {
        let kind = self.0.first()?;
        let index = self.0.get(1)?.parse().ok()?;
        Some((kind.as_str(), index))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Key used by the radix trie index
    #[must_use]
    pub(crate) fn to_trie_key(&self) -> String {
        let mut key = String::new();
        for seg in &self.0 {
            key.push_str(seg);
            key.push(TRIE_SEPARATOR);
        }
        key
    }
}

/// Parse a segment as a sequence index
#[inline]
#[must_use]
pub fn as_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Split a dotted path, normalizing `a[0]` bracket indices to `a.0`
pub(crate) fn split_dotted(s: &str) -> Result<Vec<String>, PathError> {
    let normalized = s.replace('[', ".").replace(']', "");
    normalized
        .split('.')
        .map(|seg| {
            if seg.is_empty() {
                Err(PathError::EmptySegment(s.to_string()))
            } else {
                Ok(seg.to_string())
            }
        })
        .collect()
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(split_dotted(s)?))
    }
}

/// Errors related to node paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}
