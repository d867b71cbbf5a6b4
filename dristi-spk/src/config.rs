//! Configuration for speech output

use crate::error::SpeechError;
use serde::{Deserialize, Serialize};

/// Speech output configuration, read from the `[speech]` section of the
/// session config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Render utterances through the engine; when off they are only logged
    pub enabled: bool,

    /// Preferred TTS backend
    pub engine: TtsBackend,

    /// Speech rate (words per minute, 1-500, default 150)
    pub rate: u32,

    /// Volume (0.0-1.0, default 1.0)
    pub volume: f32,

    /// Voice settings
    pub voice: VoiceConfig,

    /// How long shutdown waits for an in-flight utterance
    pub flush_timeout_ms: u64,
}

/// TTS backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TtsBackend {
    /// Platform speech (espeak-ng on Linux, say on macOS)
    Native,
    /// Print utterances to stdout
    Console,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Engine-specific voice name; overrides language and gender
    pub name: Option<String>,

    /// Language code (e.g., "en-US")
    pub language: String,

    /// Gender preference
    pub gender: Option<VoiceGender>,
}

/// Voice gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: TtsBackend::Native,
            rate: 150,
            volume: 1.0,
            voice: VoiceConfig::default(),
            flush_timeout_ms: 5000,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
            gender: Some(VoiceGender::Female),
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }

            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if name.chars().any(|c| c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

/// Whole config document; only the speech section is of interest here
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigDocument {
    speech: SpeechConfig,
}

impl SpeechConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate == 0 || self.rate > 500 {
            return Err("Speech rate must be between 1 and 500 WPM".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if self.flush_timeout_ms > 60_000 {
            return Err("Flush timeout too large (max 60000 ms)".to_string());
        }

        self.voice.validate()
    }

    /// Extract the `speech` section from a JSON or TOML config document.
    /// A document without one yields the defaults.
    pub fn from_document(content: &str) -> Result<Self, SpeechError> {
        if let Ok(doc) = serde_json::from_str::<ConfigDocument>(content) {
            return Ok(doc.speech);
        }

        toml::from_str::<ConfigDocument>(content)
            .map(|doc| doc.speech)
            .map_err(|e| SpeechError::Config(format!("Invalid speech section: {}", e)))
    }
}
