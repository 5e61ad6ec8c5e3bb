//! Validation findings

use formsync_document::SourceRange;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// How much a finding matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the user edit from being committed
    Error,
    /// Shown, not blocking
    Warning,
    /// Informational
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        write!(f, "{name}")
    }
}

/// A positioned validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Source range to underline
    pub position: SourceRange,
    /// Human readable message
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl ValidationError {
    /// Create finding
    #[must_use]
    pub fn new(position: SourceRange, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            position,
            message: message.into(),
            severity,
        }
    }

    /// First line of the finding
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        self.position.start.line
    }

    /// Whether the finding blocks a user edit
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Compact finding for lists and terminals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedError {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub col: usize,
    /// Message
    pub message: String,
}

/// Findings of one severity as `{line, col, message}`
#[must_use]
pub fn format_errors(errors: &[ValidationError], severity: Severity) -> Vec<FormattedError> {
    errors
        .iter()
        .filter(|e| e.severity == severity)
        .map(|e| FormattedError {
            line: e.position.start.line,
            col: e.position.start.col,
            message: e.message.clone(),
        })
        .collect()
}
