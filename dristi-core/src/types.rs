//! Perception records shared between the analyzers and the narrator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The three analyzer families driven by the cadence scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzerKind {
    Objects,
    Depth,
    Scene,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 3] = [AnalyzerKind::Objects, AnalyzerKind::Depth, AnalyzerKind::Scene];

    /// Stable slot index
    pub fn index(self) -> usize {
        match self {
            AnalyzerKind::Objects => 0,
            AnalyzerKind::Depth => 1,
            AnalyzerKind::Scene => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalyzerKind::Objects => "objects",
            AnalyzerKind::Depth => "depth",
            AnalyzerKind::Scene => "scene",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in absolute frame pixels (x1, y1) to (x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Multiply every coordinate, used to map model-space boxes back to the frame
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x1: self.x1 * factor,
            y1: self.y1 * factor,
            x2: self.x2 * factor,
            y2: self.y2 * factor,
        }
    }
}

/// Relative distance bucket derived from a normalized depth scalar.
///
/// Larger normalized depth means closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceCategory {
    VeryClose,
    Close,
    Medium,
    Far,
    VeryFar,
    /// The region used for the lookup was empty
    Unknown,
}

impl DistanceCategory {
    /// Bucket a normalized depth value `d` in [0, 1]
    pub fn from_normalized_depth(d: f32) -> Self {
        if d.is_nan() {
            DistanceCategory::Unknown
        } else if d > 0.75 {
            DistanceCategory::VeryClose
        } else if d > 0.55 {
            DistanceCategory::Close
        } else if d > 0.35 {
            DistanceCategory::Medium
        } else if d > 0.20 {
            DistanceCategory::Far
        } else {
            DistanceCategory::VeryFar
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DistanceCategory::VeryClose => "Very Close (<0.5m)",
            DistanceCategory::Close => "Close (0.5-1m)",
            DistanceCategory::Medium => "Medium (1-2m)",
            DistanceCategory::Far => "Far (2-3m)",
            DistanceCategory::VeryFar => "Very Far (>3m)",
            DistanceCategory::Unknown => "Unknown",
        }
    }

    /// Numeric proxy in metres, used only for ordering (closest first)
    pub fn proxy_value(self) -> f32 {
        match self {
            DistanceCategory::VeryClose => 0.3,
            DistanceCategory::Close => 0.8,
            DistanceCategory::Medium => 1.5,
            DistanceCategory::Far => 2.5,
            DistanceCategory::VeryFar => 4.0,
            DistanceCategory::Unknown => 0.5,
        }
    }

    /// Overlay color in BGR order
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            DistanceCategory::VeryClose => (0, 0, 255),
            DistanceCategory::Close => (0, 165, 255),
            DistanceCategory::Medium => (0, 255, 255),
            DistanceCategory::Far => (0, 255, 0),
            DistanceCategory::VeryFar => (0, 200, 0),
            DistanceCategory::Unknown => (255, 255, 255),
        }
    }
}

/// One detected object.
///
/// `distance` is `None` until a depth map has been applied; a degenerate
/// lookup region yields `Some(DistanceCategory::Unknown)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub distance: Option<DistanceCategory>,
}

impl Detection {
    pub fn new(name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
            distance: None,
        }
    }

    pub fn with_distance(mut self, distance: DistanceCategory) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn distance_label(&self) -> Option<&'static str> {
        self.distance.map(DistanceCategory::label)
    }

    pub fn distance_value(&self) -> Option<f32> {
        self.distance.map(DistanceCategory::proxy_value)
    }
}

/// Scene classification result, confidences on a 0-100 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub scene_type: String,
    pub scene_confidence: f32,
    pub scene_type_alt: String,
    pub condition: String,
    pub condition_confidence: f32,
    pub activity: String,
    pub activity_confidence: f32,
}

impl SceneInfo {
    /// Scene type with a leading "a " / "an " removed
    pub fn scene_name(&self) -> &str {
        strip_article(&self.scene_type)
    }

    pub fn condition_name(&self) -> &str {
        strip_article(&self.condition)
    }
}

/// Remove one leading indefinite article
pub fn strip_article(text: &str) -> &str {
    text.strip_prefix("an ")
        .or_else(|| text.strip_prefix("a "))
        .unwrap_or(text)
}

/// Immutable merged view of the latest analyzer results.
///
/// Objects, depth and scene may come from different frames; the per-field
/// frame indices record where each one originated.
#[derive(Debug, Clone)]
pub struct PerceptionSnapshot {
    pub frame_index: u64,
    pub timestamp: DateTime<Utc>,
    pub objects: Arc<Vec<Detection>>,
    pub scene: Option<SceneInfo>,
    pub fps: f32,
    pub objects_frame: Option<u64>,
    pub depth_frame: Option<u64>,
    pub scene_frame: Option<u64>,
}

impl PerceptionSnapshot {
    /// Snapshot with no analyzer output yet
    pub fn empty() -> Self {
        Self {
            frame_index: 0,
            timestamp: Utc::now(),
            objects: Arc::new(Vec::new()),
            scene: None,
            fps: 0.0,
            objects_frame: None,
            depth_frame: None,
            scene_frame: None,
        }
    }

    /// Convenience constructor for callers that build snapshots by hand
    pub fn from_parts(objects: Vec<Detection>, scene: Option<SceneInfo>) -> Self {
        Self {
            objects: Arc::new(objects),
            scene,
            ..Self::empty()
        }
    }

    pub fn field_frame(&self, kind: AnalyzerKind) -> Option<u64> {
        match kind {
            AnalyzerKind::Objects => self.objects_frame,
            AnalyzerKind::Depth => self.depth_frame,
            AnalyzerKind::Scene => self.scene_frame,
        }
    }
}

impl Default for PerceptionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
