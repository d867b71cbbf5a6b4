//! Error types for dristi-narrator

use dristi_eye::VisionError;
use dristi_spk::SpeechError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Frame acquisition failed: {0}")]
    FrameAcquisition(#[source] VisionError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Configuration error: {0}")]
    Config(String),
}
