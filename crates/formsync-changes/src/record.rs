//! Typed change records

use formsync_document::NodePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Lines added
    New,
    /// Value changed in place
    Edit,
    /// Value removed
    Delete,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::New => "N",
            Self::Edit => "E",
            Self::Delete => "D",
        };
        write!(f, "{tag}")
    }
}

/// Which side produced a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Produced by a form update
    Form,
    /// Typed by the user
    User,
}

/// One classified change
///
/// User-origin records double as pending user edits: they are remembered
/// across form updates so reconciliation keeps the user's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Change kind
    pub kind: ChangeKind,
    /// Mirror node the change decorates
    pub target_path: NodePath,
    /// Value path the diff reported
    pub diff_path: NodePath,
    /// Value before a user edit (`None` for form changes and additions)
    pub prior_value: Option<Value>,
    /// 1-based first line
    pub line: usize,
    /// Line span
    pub length: usize,
    /// Producer
    pub origin: Origin,
}

impl ChangeRecord {
    /// Create record at a position
    #[must_use]
    pub fn new(kind: ChangeKind, path: NodePath, line: usize, length: usize, origin: Origin) -> Self {
        Self {
            kind,
            target_path: path.clone(),
            diff_path: path,
            prior_value: None,
            line,
            length,
            origin,
        }
    }

    /// Set the prior value
    #[must_use]
    pub fn with_prior(mut self, prior: Option<Value>) -> Self {
        self.prior_value = prior;
        self
    }
}
