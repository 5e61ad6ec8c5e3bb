//! Path patterns for secrets, immutables, filters and field bindings
//!
//! Syntax: dot-separated segments, `a[0]` accepted as `a.0`. A segment ending
//! in `*` matches any key that starts with the text before the star, ignoring
//! case; `*` alone matches any segment. The first segment names the kind
//! bucket; when the second segment is neither numeric nor a wildcard the
//! document index is implied (`Secret.data.token` ≡ `Secret.*.data.token`).

use crate::path::{as_index, split_dotted, NodePath, PathError};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One pattern segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Exact key or index
    Literal(String),
    /// Case-insensitive key prefix (empty prefix matches anything)
    Prefix(String),
}

impl PatternSegment {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_lowercase()),
            None => Self::Literal(raw.to_string()),
        }
    }

    /// Whether the segment accepts `segment`
    #[must_use]
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == segment,
            Self::Prefix(prefix) => segment.to_lowercase().starts_with(prefix.as_str()),
        }
    }

    /// Whether the segment matches any document index
    #[inline]
    fn is_index_like(&self) -> bool {
        match self {
            Self::Literal(lit) => as_index(lit).is_some(),
            Self::Prefix(prefix) => prefix.is_empty(),
        }
    }
}

impl Display for PatternSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Compiled path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Build from raw segments (the array form of a pattern)
    #[must_use]
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let mut parsed: Vec<PatternSegment> = segments
            .iter()
            .map(|s| PatternSegment::parse(s.as_ref()))
            .collect();
        if parsed.len() > 1 && !parsed[1].is_index_like() {
            parsed.insert(1, PatternSegment::Prefix(String::new()));
        }
        Self { segments: parsed }
    }

    /// Pattern segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Whether `path` matches the pattern exactly (same depth)
    #[must_use]
    pub fn matches(&self, path: &NodePath) -> bool {
        path.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(path.iter())
                .all(|(pat, seg)| pat.matches(seg))
    }

    /// Leading literal segments, usable as a subtree lookup prefix
    #[must_use]
    pub fn literal_prefix(&self) -> NodePath {
        NodePath::new(
            self.segments
                .iter()
                .map_while(|seg| match seg {
                    PatternSegment::Literal(lit) => Some(lit.clone()),
                    PatternSegment::Prefix(_) => None,
                })
                .collect(),
        )
    }
}

impl FromStr for PathPattern {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_segments(&split_dotted(s)?))
    }
}

impl Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Parse a list of textual patterns, skipping (and logging) invalid ones
#[must_use]
pub fn parse_patterns<S: AsRef<str>>(raw: &[S]) -> Vec<PathPattern> {
    raw.iter()
        .filter_map(|p| match p.as_ref().parse() {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!("ignoring path pattern: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn implicit_document_index() {
        let pattern: PathPattern = "Secret.data.token".parse().unwrap();
        assert_eq!(pattern.to_string(), "Secret.*.data.token");
        assert!(pattern.matches(&path("Secret.3.data.token")));
        assert!(!pattern.matches(&path("Secret.3.data")));
    }

    #[test]
    fn explicit_index_kept() {
        let pattern: PathPattern = "Secret[0].data.token".parse().unwrap();
        assert!(pattern.matches(&path("Secret.0.data.token")));
        assert!(!pattern.matches(&path("Secret.1.data.token")));
    }

    #[test]
    fn wildcard_matches_to_end_of_key() {
        let pattern: PathPattern = "*.data.pass*".parse().unwrap();
        assert!(pattern.matches(&path("Secret.0.data.password")));
        assert!(pattern.matches(&path("Other.2.data.PASSPHRASE")));
        assert!(!pattern.matches(&path("Secret.0.data.token")));
    }

    #[test]
    fn wildcard_kind_and_immutable_field() {
        let pattern: PathPattern = "*.metadata.immutableTest".parse().unwrap();
        assert!(pattern.matches(&path("Policy.0.metadata.immutableTest")));
    }

    #[test]
    fn literal_prefix_stops_at_wildcard() {
        let pattern: PathPattern = "Secret.0.data.*".parse().unwrap();
        assert_eq!(pattern.literal_prefix().to_string(), "Secret.0.data");
        let implicit: PathPattern = "Secret.data".parse().unwrap();
        assert_eq!(implicit.literal_prefix().to_string(), "Secret");
    }

    #[test]
    fn invalid_patterns_skipped() {
        let patterns = parse_patterns(&["a..b", "Secret.data"]);
        assert_eq!(patterns.len(), 1);
    }
}
