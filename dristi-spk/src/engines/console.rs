//! Console engine: prints utterances instead of speaking them

use crate::config::VoiceConfig;
use crate::engines::{sanitize, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;

/// Writes each utterance to stdout. Always available.
#[derive(Debug, Default)]
pub struct ConsoleTtsEngine;

impl ConsoleTtsEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TtsEngine for ConsoleTtsEngine {
    async fn speak(&self, text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        let text = sanitize(text)?;
        println!("[dristi] {}", text);
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "console"
    }
}
