//! Error types for the sync session
//!
//! Syntax and validation findings are reported as data in pipeline outcomes;
//! these errors cover configuration and setup only.

use formsync_document::DocumentError;
use formsync_validation::ValidationSetupError;
use std::path::PathBuf;

/// Session setup error
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Any formsync error
#[derive(Debug, thiserror::Error)]
pub enum FormsyncError {
    /// Session setup failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Document rendering failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Schema could not be compiled
    #[error("schema error: {0}")]
    Schema(#[from] ValidationSetupError),
}

/// Result type for formsync operations
pub type Result<T> = std::result::Result<T, FormsyncError>;
