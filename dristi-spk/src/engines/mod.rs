//! TTS engine implementations

pub mod console;
pub mod custom;
pub mod native;

use crate::config::VoiceConfig;
use crate::error::SpeechError;
use async_trait::async_trait;

/// Longest utterance an engine accepts
pub const MAX_TEXT_LEN: usize = 10_000;

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Render `text` audibly, returning once playback has finished.
    ///
    /// Dropping the returned future must stop playback.
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Reject empty or oversized text and strip control characters
pub(crate) fn sanitize(text: &str) -> Result<String, SpeechError> {
    if text.len() > MAX_TEXT_LEN {
        return Err(SpeechError::Synthesizer(format!(
            "Text too long (max {} bytes)",
            MAX_TEXT_LEN
        )));
    }

    let sanitized: String = text.chars().filter(|c| !c.is_control()).collect();
    if sanitized.trim().is_empty() {
        return Err(SpeechError::Synthesizer("Text cannot be empty".to_string()));
    }

    Ok(sanitized)
}
