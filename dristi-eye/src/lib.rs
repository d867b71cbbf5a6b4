//! dristi-eye: perception side of the Dristi assistant
//!
//! Wraps the external object, depth and scene models behind uniform
//! analyzer adapters, runs them at independent cadences off the frame path,
//! and merges their results into one consistent perception snapshot.

pub mod aggregator;
pub mod analyzer;
pub mod camera;
pub mod depth;
pub mod error;
pub mod remote;
pub mod scene;
pub mod scheduler;

pub use aggregator::{FpsMeter, PerceptionAggregator};
pub use analyzer::{AnalyzerAdapter, AnalyzerOutput, DepthEstimator, ObjectDetector, SceneClassifier};
pub use camera::{Frame, FrameSource, ImageSequenceSource};
pub use depth::DepthMap;
pub use error::VisionError;
pub use scene::SceneAnalyzer;
pub use scheduler::{AnalyzerSlot, CadenceScheduler, SlotState};
