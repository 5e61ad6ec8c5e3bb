//! formsync Validation
//!
//! Schema validation of mapped resources with source-accurate positions.
//!
//! # Overview
//!
//! - **schema**: compile one schema or a per-type list ([`SchemaSet`])
//! - **keywords**: custom keywords (`validateName`, `validateLabel`, ...)
//! - **locate**: map instance paths onto the mirror tree
//! - **validator**: schema selection, severities, protected-line filtering

#![warn(missing_docs)]

pub mod error;
pub mod keywords;
pub mod locate;
pub mod schema;
pub mod types;
pub mod validator;

// Re-exports
pub use error::{Result, ValidationSetupError};
pub use keywords::{check_keywords, CustomKeyword, KeywordViolation};
pub use locate::{locate, Anchor};
pub use schema::{CompiledSchema, SchemaSet};
pub use types::{format_errors, FormattedError, Severity, ValidationError};
pub use validator::{template_syntax_errors, Validator, DEFAULT_KIND_THRESHOLD};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
