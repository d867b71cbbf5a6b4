//! Error types for dristi-spk

use dristi_core::Error as CoreError;
use thiserror::Error;

/// Speech output errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Synthesizer error: {0}")]
    Synthesizer(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<SpeechError> for CoreError {
    fn from(err: SpeechError) -> Self {
        CoreError::Configuration(format!("Speech error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_error_display() {
        let err = SpeechError::Engine("espeak-ng missing".to_string());
        assert_eq!(err.to_string(), "Engine error: espeak-ng missing");
    }

    #[test]
    fn test_speech_error_to_core_error() {
        let core: CoreError = SpeechError::Synthesizer("empty".to_string()).into();
        assert!(core.to_string().contains("Speech error"));
    }
}
