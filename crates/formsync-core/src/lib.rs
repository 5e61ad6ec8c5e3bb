//! formsync Core
//!
//! Keeps a form's resources and a free-form YAML buffer consistent while
//! either side is edited.
//!
//! # Overview
//!
//! - **SyncSession**: the two pipeline entry points, form update and user edit
//! - **protection**: secret masking, filtered subtrees, protected line ranges
//! - **bindings**: form field bindings and cross references between paths
//! - **debounce**: keystroke coalescing driven by caller time
//! - **config**: TOML-loadable session settings
//!
//! # Example
//!
//! ```rust
//! use formsync_core::SyncSession;
//! use serde_json::json;
//!
//! let mut session = SyncSession::builder().build();
//! let out = session
//!     .apply_form_update(&[json!({"kind": "ConfigMap", "metadata": {"name": "a"}})])
//!     .unwrap();
//! assert!(out.yaml.contains("name: a"));
//! ```

#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod debounce;
pub mod error;
pub mod protection;
pub mod session;

// Re-exports
pub use bindings::{
    cross_references, form_values, propagate_references, CrossReference, FieldBinding, FormValue, ReferenceGroup,
};
pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use error::{FormsyncError, Result, SessionError};
pub use protection::{
    is_protected, line_count, mask_for, merge_ranges, HiddenSecret, ProtectedRange, ProtectionRules, Redacted,
    RedactionCache, UID_SIBLINGS,
};
pub use session::{FormUpdateOutcome, SyncSession, SyncSessionBuilder, UserEditOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for session users
    pub use crate::{FieldBinding, FormUpdateOutcome, ProtectedRange, SyncConfig, SyncSession, UserEditOutcome};
    pub use formsync_changes::{ChangeKind, ChangeRecord};
    pub use formsync_validation::{Severity, ValidationError};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
