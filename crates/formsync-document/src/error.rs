//! Error types for document mapping and rendering

use crate::path::PathError;
use thiserror::Error;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Document errors
///
/// YAML syntax problems are not errors here: they are reported as
/// [`crate::SyntaxError`] data alongside the documents that did parse.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Invalid path or pattern text
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Resource could not be rendered as YAML
    #[error("yaml serialization failed: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
