//! dristi-core: shared data model for the Dristi perception assistant
//!
//! Holds the detection and scene records produced by the analyzers, the
//! immutable perception snapshot read by the narration layer, and the
//! session configuration.

pub mod types;
pub mod error;
pub mod config;

pub use error::{Error, Result};
pub use types::{
    AnalyzerKind, BoundingBox, Detection, DistanceCategory, PerceptionSnapshot, SceneInfo,
};
pub use config::{
    AnalyzerEndpoints, CadenceConfig, CameraConfig, DristiConfig, NarrationConfig,
};
