//! Keystroke debouncing
//!
//! Keystrokes replace the pending text and restart the quiet period; nothing
//! queues. The caller drives time, so the debouncer never sleeps.

use std::time::{Duration, Instant};

/// Latest-text-wins debouncer
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    /// Create debouncer with a quiet period
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record a keystroke at `now`
    pub fn push(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    /// Take the pending text once the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.window);
        if ready {
            self.pending.take().map(|(text, _)| text)
        } else {
            None
        }
    }
}
