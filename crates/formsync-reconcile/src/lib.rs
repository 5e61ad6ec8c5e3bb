//! formsync Reconciliation
//!
//! Three-way merge of form output into user-customized resources.
//!
//! # Overview
//!
//! - **matching**: identity and similarity based resource pairing
//! - **reconcile**: replay of form changes onto the user's resources, with
//!   pending user edits taking precedence

#![warn(missing_docs)]

pub mod matching;
pub mod reconcile;

// Re-exports
pub use formsync_document::resource_id;
pub use matching::{comparable_body, pair_resources};
pub use reconcile::{reconcile, ChangeStack, Reconciled};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
