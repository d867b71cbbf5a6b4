//! dristi-spk: speech output for the Dristi assistant
//!
//! Provides:
//! - Native TTS engines driven as subprocesses (espeak-ng, say)
//! - A console engine for headless sessions
//! - Closure-backed custom engines
//! - A single-slot speech channel that never overlaps or backlogs utterances

pub mod channel;
pub mod config;
pub mod engines;
pub mod error;

pub use channel::SpeechChannel;
pub use config::{SpeechConfig, TtsBackend, VoiceConfig, VoiceGender};
pub use engines::console::ConsoleTtsEngine;
pub use engines::custom::CustomTtsEngine;
pub use engines::native::NativeTtsEngine;
pub use engines::TtsEngine;
pub use error::SpeechError;
