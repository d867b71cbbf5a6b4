//! Analyzer adapters
//!
//! Each external model is reached through one of three narrow traits. The
//! `AnalyzerAdapter` wraps any of them behind a single `invoke` call and an
//! availability flag so the scheduler can treat every kind the same way.

use crate::camera::Frame;
use crate::depth::DepthMap;
use crate::error::VisionError;
use crate::scene::SceneAnalyzer;
use async_trait::async_trait;
use dristi_core::{AnalyzerKind, Detection, SceneInfo};
use std::sync::Arc;
use tracing::debug;

/// Object detection backend
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect objects; boxes are in absolute frame pixels
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;

    fn name(&self) -> &str;
}

/// Monocular depth backend
#[async_trait]
pub trait DepthEstimator: Send + Sync {
    /// Relative depth map at frame resolution, normalized to [0, 1] (closer is larger)
    async fn estimate(&self, frame: &Frame) -> Result<DepthMap, VisionError>;

    fn name(&self) -> &str;
}

/// Image-text similarity backend used for scene classification
#[async_trait]
pub trait SceneClassifier: Send + Sync {
    /// Raw cosine similarity between the frame and each prompt, in prompt order
    async fn similarities(&self, frame: &Frame, prompts: &[&str]) -> Result<Vec<f32>, VisionError>;

    fn name(&self) -> &str;
}

/// Result of one completed analyzer invocation
#[derive(Debug, Clone)]
pub enum AnalyzerOutput {
    Objects(Vec<Detection>),
    Depth(DepthMap),
    Scene(SceneInfo),
}

impl AnalyzerOutput {
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            AnalyzerOutput::Objects(_) => AnalyzerKind::Objects,
            AnalyzerOutput::Depth(_) => AnalyzerKind::Depth,
            AnalyzerOutput::Scene(_) => AnalyzerKind::Scene,
        }
    }
}

#[derive(Clone)]
enum Backend {
    Objects(Arc<dyn ObjectDetector>),
    Depth(Arc<dyn DepthEstimator>),
    Scene(Arc<SceneAnalyzer>),
    Unavailable(String),
}

/// Uniform wrapper around one external model
#[derive(Clone)]
pub struct AnalyzerAdapter {
    kind: AnalyzerKind,
    backend: Backend,
}

impl AnalyzerAdapter {
    pub fn objects(detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            kind: AnalyzerKind::Objects,
            backend: Backend::Objects(detector),
        }
    }

    pub fn depth(estimator: Arc<dyn DepthEstimator>) -> Self {
        Self {
            kind: AnalyzerKind::Depth,
            backend: Backend::Depth(estimator),
        }
    }

    pub fn scene(classifier: Arc<dyn SceneClassifier>) -> Self {
        Self {
            kind: AnalyzerKind::Scene,
            backend: Backend::Scene(Arc::new(SceneAnalyzer::new(classifier))),
        }
    }

    /// An adapter whose model failed to initialize
    pub fn unavailable(kind: AnalyzerKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            backend: Backend::Unavailable(reason.into()),
        }
    }

    /// Build an adapter from a fallible model initialization.
    ///
    /// A failed initialization yields an unavailable adapter; the scheduler
    /// reports it when the slot is built.
    pub fn from_init<T, F>(kind: AnalyzerKind, init: Result<T, VisionError>, wrap: F) -> Self
    where
        F: FnOnce(T) -> AnalyzerAdapter,
    {
        match init {
            Ok(model) => wrap(model),
            Err(e) => {
                debug!("{} analyzer init failed: {}", kind, e);
                Self::unavailable(kind, e.to_string())
            }
        }
    }

    pub fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, Backend::Unavailable(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            Backend::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.backend {
            Backend::Objects(d) => d.name(),
            Backend::Depth(d) => d.name(),
            Backend::Scene(s) => s.name(),
            Backend::Unavailable(_) => "unavailable",
        }
    }

    /// Run the wrapped model once on `frame`
    pub async fn invoke(&self, frame: &Frame) -> Result<AnalyzerOutput, VisionError> {
        match &self.backend {
            Backend::Objects(detector) => detector.detect(frame).await.map(AnalyzerOutput::Objects),
            Backend::Depth(estimator) => {
                let map = estimator.estimate(frame).await?;
                map.resized(frame.width(), frame.height()).map(AnalyzerOutput::Depth)
            }
            Backend::Scene(analyzer) => analyzer.analyze(frame).await.map(AnalyzerOutput::Scene),
            Backend::Unavailable(reason) => Err(VisionError::Model(format!(
                "{} analyzer unavailable: {}",
                self.kind, reason
            ))),
        }
    }
}

type DetectFn = dyn Fn(&Frame) -> Result<Vec<Detection>, VisionError> + Send + Sync;
type EstimateFn = dyn Fn(&Frame) -> Result<DepthMap, VisionError> + Send + Sync;
type SimilarityFn = dyn Fn(&Frame, &[&str]) -> Result<Vec<f32>, VisionError> + Send + Sync;

/// Closure-backed detector for embedding custom models
pub struct CustomDetector {
    name: String,
    detect_fn: Arc<DetectFn>,
}

impl CustomDetector {
    pub fn new<F>(name: impl Into<String>, detect_fn: F) -> Self
    where
        F: Fn(&Frame) -> Result<Vec<Detection>, VisionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            detect_fn: Arc::new(detect_fn),
        }
    }
}

#[async_trait]
impl ObjectDetector for CustomDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        (self.detect_fn)(frame)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Closure-backed depth estimator
pub struct CustomDepthEstimator {
    name: String,
    estimate_fn: Arc<EstimateFn>,
}

impl CustomDepthEstimator {
    pub fn new<F>(name: impl Into<String>, estimate_fn: F) -> Self
    where
        F: Fn(&Frame) -> Result<DepthMap, VisionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            estimate_fn: Arc::new(estimate_fn),
        }
    }
}

#[async_trait]
impl DepthEstimator for CustomDepthEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<DepthMap, VisionError> {
        (self.estimate_fn)(frame)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Closure-backed scene classifier
pub struct CustomSceneClassifier {
    name: String,
    similarity_fn: Arc<SimilarityFn>,
}

impl CustomSceneClassifier {
    pub fn new<F>(name: impl Into<String>, similarity_fn: F) -> Self
    where
        F: Fn(&Frame, &[&str]) -> Result<Vec<f32>, VisionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            similarity_fn: Arc::new(similarity_fn),
        }
    }
}

#[async_trait]
impl SceneClassifier for CustomSceneClassifier {
    async fn similarities(&self, frame: &Frame, prompts: &[&str]) -> Result<Vec<f32>, VisionError> {
        (self.similarity_fn)(frame, prompts)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
