//! Scene understanding over fixed text prompts

use crate::analyzer::SceneClassifier;
use crate::camera::Frame;
use crate::error::VisionError;
use dristi_core::SceneInfo;
use std::sync::Arc;
use tracing::debug;

pub const SCENE_TYPE_PROMPTS: [&str; 10] = [
    "an indoor room",
    "an outdoor area",
    "a kitchen with appliances",
    "a bedroom with bed",
    "an office with desk and computer",
    "a living room with furniture",
    "a street with buildings",
    "a park with trees and grass",
    "a store or shop",
    "a bathroom",
];

pub const CONDITION_PROMPTS: [&str; 6] = [
    "a crowded busy place with many people",
    "a quiet empty space with few objects",
    "a well-lit bright environment",
    "a dark dimly-lit space",
    "a clean organized area",
    "a cluttered messy space",
];

pub const ACTIVITY_PROMPTS: [&str; 6] = [
    "people walking or moving",
    "people sitting and resting",
    "people working at desk or computer",
    "people eating or drinking",
    "people talking or interacting",
    "no visible human activity",
];

/// Similarities are scaled by this before the softmax
const LOGIT_SCALE: f32 = 100.0;

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Indices and values of the `k` largest probabilities, largest first.
/// Ties keep prompt order.
pub fn top_k(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().cloned().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

/// Turns raw classifier similarities into a `SceneInfo`
pub struct SceneAnalyzer {
    classifier: Arc<dyn SceneClassifier>,
}

impl SceneAnalyzer {
    pub fn new(classifier: Arc<dyn SceneClassifier>) -> Self {
        Self { classifier }
    }

    pub fn name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify scene type (top 2), condition (top 2) and activity (top 1)
    pub async fn analyze(&self, frame: &Frame) -> Result<SceneInfo, VisionError> {
        let scene = self.rank(frame, &SCENE_TYPE_PROMPTS, 2).await?;
        let condition = self.rank(frame, &CONDITION_PROMPTS, 2).await?;
        let activity = self.rank(frame, &ACTIVITY_PROMPTS, 1).await?;

        let info = SceneInfo {
            scene_type: SCENE_TYPE_PROMPTS[scene[0].0].to_string(),
            scene_confidence: scene[0].1,
            scene_type_alt: SCENE_TYPE_PROMPTS[scene[1].0].to_string(),
            condition: CONDITION_PROMPTS[condition[0].0].to_string(),
            condition_confidence: condition[0].1,
            activity: ACTIVITY_PROMPTS[activity[0].0].to_string(),
            activity_confidence: activity[0].1,
        };

        debug!(
            "Scene: {} ({:.1}%), {} ({:.1}%)",
            info.scene_type, info.scene_confidence, info.condition, info.condition_confidence
        );
        Ok(info)
    }

    /// Top `k` prompts with confidences on a 0-100 scale
    async fn rank(&self, frame: &Frame, prompts: &[&str], k: usize) -> Result<Vec<(usize, f32)>, VisionError> {
        let similarities = self.classifier.similarities(frame, prompts).await?;
        if similarities.len() != prompts.len() {
            return Err(VisionError::Model(format!(
                "Scene classifier returned {} scores for {} prompts",
                similarities.len(),
                prompts.len()
            )));
        }

        let logits: Vec<f32> = similarities.iter().map(|s| s * LOGIT_SCALE).collect();
        let probs = softmax(&logits);
        Ok(top_k(&probs, k)
            .into_iter()
            .map(|(idx, p)| (idx, p * 100.0))
            .collect())
    }
}
