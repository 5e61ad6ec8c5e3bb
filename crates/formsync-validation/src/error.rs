//! Error types for schema setup

use thiserror::Error;

/// Result type for schema setup
pub type Result<T> = std::result::Result<T, ValidationSetupError>;

/// Schema setup errors
///
/// Validation findings are data ([`crate::ValidationError`]); these errors
/// only describe a schema that could not be turned into a validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationSetupError {
    /// Schema list entry without a usable shape
    #[error("invalid schema entry {index}: {reason}")]
    InvalidEntry {
        /// Position in the schema list
        index: usize,
        /// What is wrong
        reason: String,
    },

    /// Schema rejected by the compiler
    #[error("schema for '{kind}' failed to compile: {message}")]
    Compile {
        /// Resource type the schema was for
        kind: String,
        /// Compiler message
        message: String,
    },
}
