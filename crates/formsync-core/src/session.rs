//! Sync Session
//!
//! One open editor: owns the change stack, pending user edits, redaction
//! cache, last form snapshot, validator and keystroke debouncer.
//!
//! # Core Concepts
//!
//! - **Form update**: render form resources, fold in the user's
//!   customizations, redact, classify form changes, validate.
//! - **User edit**: map the typed text, keep protected values, restore hidden
//!   values, classify user changes against the last form snapshot, carry
//!   edits over to cross references, validate, and when the buffer is
//!   error-free record it as the user's customization and read back bound
//!   form fields.
//! - **Serialized**: both entry points take `&mut self`; a run that stops
//!   on a syntax error commits nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut session = SyncSession::builder()
//!     .with_schema(schema)
//!     .with_secrets(["Secret.*.data.*"])
//!     .build();
//! let form = session.apply_form_update(&resources)?;
//! let user = session.apply_user_edit(&edited_text);
//! ```

use crate::bindings::{
    cross_references, form_values, propagate_references, CrossReference, FieldBinding, FormValue, ReferenceGroup,
};
use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::protection::{is_protected, line_count, ProtectedRange, ProtectionRules, RedactionCache};
use formsync_changes::{form_changes, format_changes, user_changes, ChangeKind, ChangeRecord, FormattedChange, Side};
use formsync_document::{map, stringify, Comparison, Snapshot, SyntaxError};
use formsync_reconcile::{reconcile, ChangeStack};
use formsync_validation::{template_syntax_errors, SchemaSet, ValidationError, Validator};
use serde_json::Value;
use std::time::Instant;

/// Result of a form update
#[derive(Debug, Clone)]
pub struct FormUpdateOutcome {
    /// Text to show in the editor
    pub yaml: String,
    /// Lines the user may not edit
    pub protected_ranges: Vec<ProtectedRange>,
    /// Validation findings
    pub errors: Vec<ValidationError>,
    /// YAML syntax errors
    pub syntax_errors: Vec<SyntaxError>,
    /// Form changes and surviving user edits
    pub changes: Vec<ChangeRecord>,
    /// Changes ready for display
    pub formatted: Vec<FormattedChange>,
    /// User edits still pending
    pub user_edits: Vec<ChangeRecord>,
}

/// Result of a user edit
#[derive(Debug, Clone)]
pub struct UserEditOutcome {
    /// Lines the user may not edit
    pub protected_ranges: Vec<ProtectedRange>,
    /// Validation findings
    pub errors: Vec<ValidationError>,
    /// YAML syntax errors
    pub syntax_errors: Vec<SyntaxError>,
    /// User changes relative to the last form output
    pub changes: Vec<ChangeRecord>,
    /// Changes ready for display
    pub formatted: Vec<FormattedChange>,
    /// Typed resources with hidden and protected values restored
    pub resources: Vec<Value>,
    /// Bound form fields read back from a clean edit
    pub form_values: Vec<FormValue>,
    /// Findings on bound form fields; shown, not blocking the commit
    pub binding_errors: Vec<ValidationError>,
}

impl UserEditOutcome {
    /// Check if the edit can be synchronized back to the form
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.syntax_errors.is_empty() && !self.errors.iter().any(ValidationError::is_blocking)
    }
}

/// Last form output as the classifier sees it
#[derive(Debug, Clone)]
struct FormState {
    snapshot: Snapshot,
    comparison: Comparison,
    resources: Vec<Value>,
    protected_ranges: Vec<ProtectedRange>,
}

/// Builder for [`SyncSession`]
#[derive(Debug, Clone, Default)]
pub struct SyncSessionBuilder {
    schema: Option<Value>,
    secrets: Vec<String>,
    immutables: Vec<String>,
    filters: Vec<String>,
    bindings: Vec<FieldBinding>,
    references: Vec<ReferenceGroup>,
    config: SyncConfig,
}

impl SyncSessionBuilder {
    /// Validate against a lone schema or a list of per-type entries
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Secret path patterns
    #[must_use]
    pub fn with_secrets<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Immutable path patterns
    #[must_use]
    pub fn with_immutables<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.immutables = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Filtered path patterns
    #[must_use]
    pub fn with_filters<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Form fields bound to YAML paths
    #[must_use]
    pub fn with_bindings<I: IntoIterator<Item = FieldBinding>>(mut self, bindings: I) -> Self {
        self.bindings = bindings.into_iter().collect();
        self
    }

    /// Groups of path patterns whose values refer to each other
    #[must_use]
    pub fn with_references<I: IntoIterator<Item = ReferenceGroup>>(mut self, groups: I) -> Self {
        self.references = groups.into_iter().collect();
        self
    }

    /// Session configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the session
    ///
    /// A schema that does not compile is logged and the session runs without
    /// validation.
    #[must_use]
    pub fn build(self) -> SyncSession {
        let validator = self.schema.and_then(|schema| match SchemaSet::compile(&schema) {
            Ok(set) => Some(Validator::new(set).with_kind_threshold(self.config.similarity_threshold)),
            Err(err) => {
                tracing::warn!(error = %err, "schema did not compile, validation disabled");
                None
            }
        });
        tracing::info!(
            validating = validator.is_some(),
            secrets = self.secrets.len(),
            immutables = self.immutables.len(),
            filters = self.filters.len(),
            "sync session created"
        );
        SyncSession {
            rules: ProtectionRules::new(&self.secrets, &self.immutables, &self.filters),
            validator,
            debouncer: Debouncer::new(self.config.debounce()),
            bindings: self.bindings,
            reference_groups: self.references,
            references: Vec::new(),
            config: self.config,
            stack: None,
            pending_edits: Vec::new(),
            cache: RedactionCache::default(),
            last_form: None,
        }
    }
}

/// State of one editing session
#[derive(Debug)]
pub struct SyncSession {
    config: SyncConfig,
    rules: ProtectionRules,
    validator: Option<Validator>,
    stack: Option<ChangeStack>,
    pending_edits: Vec<ChangeRecord>,
    cache: RedactionCache,
    last_form: Option<FormState>,
    bindings: Vec<FieldBinding>,
    reference_groups: Vec<ReferenceGroup>,
    references: Vec<CrossReference>,
    debouncer: Debouncer,
}

impl SyncSession {
    /// Start building a session
    #[must_use]
    pub fn builder() -> SyncSessionBuilder {
        SyncSessionBuilder::default()
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Change display settings; takes effect on the next form update
    pub fn set_show_secrets(&mut self, show: bool) {
        self.config.show_secrets = show;
    }

    /// Customization stack, once the user made an error-free edit
    #[inline]
    #[must_use]
    pub fn change_stack(&self) -> Option<&ChangeStack> {
        self.stack.as_ref()
    }

    /// User edits not yet absorbed by the form
    #[inline]
    #[must_use]
    pub fn pending_edits(&self) -> &[ChangeRecord] {
        &self.pending_edits
    }

    /// Values currently hidden from the buffer
    #[inline]
    #[must_use]
    pub fn redaction_cache(&self) -> &RedactionCache {
        &self.cache
    }

    /// Cross references found in the last form output
    #[inline]
    #[must_use]
    pub fn references(&self) -> &[CrossReference] {
        &self.references
    }

    /// Render new form output into the buffer
    ///
    /// # Errors
    /// Returns error if the resources cannot be rendered as YAML
    pub fn apply_form_update(&mut self, resources: &[Value]) -> Result<FormUpdateOutcome> {
        let form_yaml = stringify(resources)?;
        let form = map(&form_yaml);
        let comparison = form.snapshot.comparison();
        let form_resources = form.snapshot.resources.clone();

        let merged = match &self.stack {
            Some(stack) if !form.has_syntax_errors() => {
                Some(reconcile(stack, &self.pending_edits, &form.snapshot.resources))
            }
            _ => None,
        };
        let (yaml, unredacted, syntax_errors) = match merged {
            Some(merged) => {
                self.pending_edits = merged.edits;
                self.stack = Some(merged.stack);
                let yaml = stringify(&merged.resources)?;
                let mapped = map(&yaml);
                (yaml, mapped.snapshot, mapped.syntax_errors)
            }
            None => (form_yaml, form.snapshot, form.syntax_errors),
        };

        let redacted = self.rules.redact(&yaml, unredacted, &self.config)?;
        if syntax_errors.is_empty() {
            self.cache = redacted.cache;
        }
        let snapshot = redacted.snapshot;
        let protected_ranges = self.rules.protected_ranges(&snapshot, &self.config, line_count(&redacted.yaml));
        if syntax_errors.is_empty() {
            self.references = cross_references(&self.reference_groups, &snapshot);
        }

        let prior = self.last_form.as_ref().map(|last| Side::new(&last.snapshot, &last.comparison));
        let settled = form_changes(Side::new(&snapshot, &comparison), prior, &self.pending_edits);
        self.pending_edits = settled.remaining_edits;

        let errors = if syntax_errors.is_empty() {
            let mut restored = snapshot.clone();
            self.cache.restore(&mut restored);
            self.validate(&restored, &protected_ranges)
        } else {
            Vec::new()
        };
        let formatted = format_changes(&settled.changes, &snapshot);

        tracing::debug!(
            changes = settled.changes.len(),
            pending = self.pending_edits.len(),
            errors = errors.len(),
            "applied form update"
        );
        self.last_form = Some(FormState {
            snapshot,
            comparison,
            resources: form_resources,
            protected_ranges: protected_ranges.clone(),
        });
        Ok(FormUpdateOutcome {
            yaml: redacted.yaml,
            protected_ranges,
            errors,
            syntax_errors,
            changes: settled.changes,
            formatted,
            user_edits: self.pending_edits.clone(),
        })
    }

    /// Process text the user typed
    ///
    /// Protected values never leave the editor: they are taken from the last
    /// form output before anything is classified or committed.
    pub fn apply_user_edit(&mut self, text: &str) -> UserEditOutcome {
        let mapped = map(text);
        // as typed, masks in place; used for display
        let mut visible = mapped.snapshot;
        self.cache.mark_secrets(&mut visible);
        let mut snapshot = visible.clone();
        let protected_ranges = self.rules.protected_ranges(&snapshot, &self.config, line_count(text));

        if !mapped.syntax_errors.is_empty() {
            tracing::debug!(errors = mapped.syntax_errors.len(), "user edit has syntax errors");
            return UserEditOutcome {
                protected_ranges,
                errors: Vec::new(),
                syntax_errors: mapped.syntax_errors,
                changes: Vec::new(),
                formatted: Vec::new(),
                resources: snapshot.resources,
                form_values: Vec::new(),
                binding_errors: Vec::new(),
            };
        }

        if self.config.readonly {
            tracing::debug!("readonly buffer, edit ignored");
            return UserEditOutcome {
                protected_ranges,
                errors: Vec::new(),
                syntax_errors: Vec::new(),
                changes: Vec::new(),
                formatted: Vec::new(),
                resources: self.last_form.as_ref().map(|last| last.resources.clone()).unwrap_or_default(),
                form_values: Vec::new(),
                binding_errors: Vec::new(),
            };
        }

        if let Some(last) = &self.last_form {
            self.rules.pin_protected(&mut snapshot, &last.snapshot, &self.config);
        }
        self.cache.restore(&mut snapshot);

        let comparison = snapshot.comparison();
        let last_form = self.last_form.as_ref().map(|last| Side::new(&last.snapshot, &last.comparison));
        let mut changes = user_changes(Side::new(&snapshot, &comparison), last_form, &self.pending_edits);
        // deletes point into the last form output, everything else into the text
        let prior_ranges = self.last_form.as_ref().map_or(&[][..], |last| &last.protected_ranges[..]);
        changes.retain(|record| match record.kind {
            ChangeKind::Delete => !is_protected(prior_ranges, record.line),
            ChangeKind::New | ChangeKind::Edit => !is_protected(&protected_ranges, record.line),
        });
        let formatted = format_changes(&changes, &visible);
        let propagated = propagate_references(&changes, &self.references, &mut snapshot, |line| {
            is_protected(&protected_ranges, line)
        });
        changes.extend(propagated);

        let errors = self.validate(&snapshot, &protected_ranges);
        let mut outcome = UserEditOutcome {
            protected_ranges,
            errors,
            syntax_errors: Vec::new(),
            changes,
            formatted,
            resources: snapshot.resources.clone(),
            form_values: Vec::new(),
            binding_errors: Vec::new(),
        };

        self.pending_edits.clone_from(&outcome.changes);
        if outcome.is_clean() {
            let base = match (&self.stack, &self.last_form) {
                (Some(stack), _) => stack.base.clone(),
                (None, Some(last)) => last.resources.clone(),
                (None, None) => Vec::new(),
            };
            self.stack = Some(ChangeStack::new(base, outcome.resources.clone()));
            (outcome.form_values, outcome.binding_errors) = form_values(&self.bindings, &snapshot);
        }
        tracing::debug!(
            changes = outcome.changes.len(),
            errors = outcome.errors.len(),
            "applied user edit"
        );
        outcome
    }

    /// Record a keystroke; processing waits for the debounce window
    pub fn push_keystroke(&mut self, text: impl Into<String>, now: Instant) {
        self.debouncer.push(text, now);
    }

    /// Process the pending keystroke once its debounce window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<UserEditOutcome> {
        let text = self.debouncer.poll(now)?;
        Some(self.apply_user_edit(&text))
    }

    fn validate(&self, snapshot: &Snapshot, protected: &[ProtectedRange]) -> Vec<ValidationError> {
        let mut errors = self
            .validator
            .as_ref()
            .map(|validator| validator.validate(snapshot, |line| is_protected(protected, line)))
            .unwrap_or_default();
        errors.extend(
            template_syntax_errors(snapshot)
                .into_iter()
                .filter(|error| !is_protected(protected, error.line())),
        );
        errors
    }
}
