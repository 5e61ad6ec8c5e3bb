//! formsync Document Layer
//!
//! YAML text to value trees with a position-annotated mirror.
//!
//! # Overview
//!
//! The document layer provides:
//! - **map**: multi-document YAML into a kind-bucketed [`Snapshot`]
//! - **MappingNode**: mirror tree carrying 1-based lines, spans and ranges
//! - **PathIndex**: radix tree over every mirror node, queried by [`PathPattern`]
//! - **stringify**: canonical YAML rendering of resources
//!
//! # Example
//!
//! ```rust
//! use formsync_document::{map, NodePath};
//!
//! let mapped = map("kind: Policy\nmetadata:\n  name: a\n");
//! let path: NodePath = "Policy.0.metadata.name".parse().unwrap();
//! assert_eq!(mapped.snapshot.node_at(&path).unwrap().line(), 3);
//! ```

#![warn(missing_docs)]

pub mod annotated;
pub mod error;
pub mod identity;
pub mod index;
pub mod mapper;
pub mod path;
pub mod pattern;
pub mod scalar;
pub mod snapshot;
pub mod stringify;
pub mod value;

// Re-exports
pub use annotated::{Annotated, AnnotatedBody, MappingNode, NodeMeta, SourcePos, SourceRange};
pub use error::{DocumentError, Result};
pub use identity::{best_match, resource_id, similarity};
pub use index::{IndexEntry, PathIndex};
pub use mapper::{map, parse_documents, MappedText, ParsedDocument, SyntaxError};
pub use path::{as_index, NodePath, PathError};
pub use pattern::{parse_patterns, PathPattern, PatternSegment};
pub use snapshot::{bucket_for, Comparison, Snapshot, ROOT_BUCKET};
pub use stringify::{order_keys, stringify, stringify_one};
pub use value::{get_path, get_path_mut, set_path, unset_path};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for document operations
    pub use crate::{
        map, stringify, Comparison, MappedText, MappingNode, NodePath, PathIndex, PathPattern,
        Snapshot, SyntaxError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
