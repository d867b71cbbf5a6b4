//! Key command dispatcher

use crate::policy::{NarrationMode, NarrationRequest};
use crate::state::NarrationState;
use std::time::Instant;

pub const AUTO_OFF: &str = "Auto narration disabled. Press space for descriptions.";

/// What the session should do with one input code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Narrate(NarrationRequest),
    /// Informational utterance that is not a description
    Announce(String),
    Quit,
    /// Unknown code, nothing to do
    Ignored,
}

/// Maps input codes to narration requests
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Narration mode bound to `code`, if any
    pub fn mode_for(code: char) -> Option<NarrationMode> {
        match code {
            ' ' => Some(NarrationMode::Full),
            'h' => Some(NarrationMode::Hazards),
            'l' => Some(NarrationMode::Location),
            'o' => Some(NarrationMode::Objects),
            'p' => Some(NarrationMode::People),
            'r' => Some(NarrationMode::Repeat),
            'c' => Some(NarrationMode::Surroundings),
            _ => None,
        }
    }

    pub fn dispatch(&self, code: char, now: Instant, state: &mut NarrationState) -> Dispatch {
        if let Some(mode) = Self::mode_for(code) {
            return Dispatch::Narrate(NarrationRequest::new(mode, now));
        }

        match code {
            'a' => {
                if state.toggle_auto(now) {
                    Dispatch::Announce(auto_on_message(state.auto_interval().as_secs()))
                } else {
                    Dispatch::Announce(AUTO_OFF.to_string())
                }
            }
            'q' => Dispatch::Quit,
            _ => Dispatch::Ignored,
        }
    }
}

pub fn auto_on_message(interval_secs: u64) -> String {
    format!(
        "Auto narration enabled. I will describe your surroundings every {} seconds.",
        interval_secs
    )
}
