//! Error types for dristi-eye

use dristi_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        CoreError::Configuration(format!("Vision error: {}", err))
    }
}
