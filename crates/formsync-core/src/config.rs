//! Session configuration
//!
//! Loaded from TOML; every field is optional:
//!
//! ```toml
//! debounce_ms = 500
//! readonly = false
//! show_secrets = false
//! ```

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration of one sync session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a keystroke burst is processed
    pub debounce_ms: u64,
    /// Allow editing identity fields of resources that carry `metadata.uid`
    pub editable_uid_siblings: bool,
    /// Protect the whole buffer
    pub readonly: bool,
    /// Render secrets in plain text
    pub show_secrets: bool,
    /// Render filtered subtrees
    pub show_filtered: bool,
    /// Similarity a resource kind needs to pick another type's schema
    pub similarity_threshold: f64,
    /// Maximum mask width
    pub secret_mask_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            editable_uid_siblings: false,
            readonly: false,
            show_secrets: false,
            show_filtered: false,
            similarity_threshold: 0.7,
            secret_mask_limit: 20,
        }
    }
}

impl SyncConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this shape
    pub fn from_toml_str(text: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded session config");
        Ok(config)
    }

    /// Set debounce window in milliseconds
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Allow or forbid editing identity fields
    #[must_use]
    pub fn with_editable_uid_siblings(mut self, editable: bool) -> Self {
        self.editable_uid_siblings = editable;
        self
    }

    /// Make the whole buffer read-only
    #[must_use]
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Reveal or hide secrets
    #[must_use]
    pub fn with_show_secrets(mut self, show: bool) -> Self {
        self.show_secrets = show;
        self
    }

    /// Reveal or hide filtered subtrees
    #[must_use]
    pub fn with_show_filtered(mut self, show: bool) -> Self {
        self.show_filtered = show;
        self
    }

    /// Set kind similarity threshold for schema selection
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set maximum mask width
    #[must_use]
    pub fn with_secret_mask_limit(mut self, limit: usize) -> Self {
        self.secret_mask_limit = limit;
        self
    }

    /// Debounce window as a duration
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.secret_mask_limit, 20);
        assert!(!config.readonly);
        assert!((config.similarity_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("readonly = true\ndebounce_ms = 50\n").unwrap();
        assert!(config.readonly);
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.secret_mask_limit, 20);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "show_secrets = true").unwrap();
        let config = SyncConfig::load(file.path()).unwrap();
        assert!(config.show_secrets);
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SessionError::ConfigRead { .. }));
    }

    #[test]
    fn bad_toml_is_error() {
        assert!(matches!(
            SyncConfig::from_toml_str("debounce_ms = \"soon\""),
            Err(SessionError::ConfigParse(_))
        ));
    }
}
