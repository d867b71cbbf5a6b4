//! Session-wide narration state

use std::time::{Duration, Instant};

/// Last description and the auto-narration timer.
///
/// Owned by the session; the dispatcher and the frame path both mutate it
/// through `&mut`, so writes are serialized by construction.
#[derive(Debug, Clone)]
pub struct NarrationState {
    last_description: Option<String>,
    auto_narrate: bool,
    auto_interval: Duration,
    last_narration: Instant,
}

impl NarrationState {
    pub fn new(auto_interval: Duration, auto_narrate: bool, now: Instant) -> Self {
        Self {
            last_description: None,
            auto_narrate,
            auto_interval,
            last_narration: now,
        }
    }

    pub fn last_description(&self) -> Option<&str> {
        self.last_description.as_deref()
    }

    pub fn remember(&mut self, description: impl Into<String>) {
        self.last_description = Some(description.into());
    }

    pub fn auto_narrate(&self) -> bool {
        self.auto_narrate
    }

    pub fn auto_interval(&self) -> Duration {
        self.auto_interval
    }

    pub fn last_narration(&self) -> Instant {
        self.last_narration
    }

    /// Flip auto-narration and return the new setting. Turning it on restarts
    /// the timer so the first automatic description comes one full interval
    /// later.
    pub fn toggle_auto(&mut self, now: Instant) -> bool {
        self.auto_narrate = !self.auto_narrate;
        if self.auto_narrate {
            self.last_narration = now;
        }
        self.auto_narrate
    }

    pub fn auto_due(&self, now: Instant) -> bool {
        self.auto_narrate && now.saturating_duration_since(self.last_narration) >= self.auto_interval
    }

    pub fn mark_auto(&mut self, now: Instant) {
        self.last_narration = now;
    }
}
