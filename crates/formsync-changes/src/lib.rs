//! formsync Change Classification
//!
//! Typed differences between snapshots of the same YAML buffer.
//!
//! # Overview
//!
//! - **diff**: New/Edit/Delete/Array taxonomy over comparison maps
//! - **normalize**: identity-based alignment of kind buckets before diffing
//! - **classify**: positioned [`ChangeRecord`]s, form and user merge rules
//! - **format**: display records, sorted and consolidated

#![warn(missing_docs)]

pub mod classify;
pub mod diff;
pub mod format;
pub mod normalize;
pub mod record;

// Re-exports
pub use classify::{classify, form_changes, user_changes, FormChanges, Side};
pub use diff::{diff_comparisons, diff_values, Diff};
pub use format::{format_changes, FormattedChange};
pub use normalize::normalize;
pub use record::{ChangeKind, ChangeRecord, Origin};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
