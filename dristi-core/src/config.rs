//! Session configuration for Dristi
//!
//! Loaded from a JSON or TOML file, then overridden by `DRISTI_*`
//! environment variables and finally by command line flags.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Frame acquisition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Target frames per second
    pub frame_rate: u32,
    /// Frames are resized to this width, keeping aspect ratio
    pub frame_width: u32,
    /// Directory of still images replayed as the camera feed
    pub source: Option<PathBuf>,
    /// Restart the image sequence when it runs out
    pub loop_source: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frame_rate: 15,
            frame_width: 640,
            source: None,
            loop_source: false,
        }
    }
}

/// Per-analyzer invocation intervals, in frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub detection_interval: u64,
    pub depth_interval: u64,
    pub scene_interval: u64,
    pub enable_depth: bool,
    pub enable_scene: bool,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            detection_interval: 1,
            depth_interval: 2,
            scene_interval: 30,
            enable_depth: false,
            enable_scene: true,
        }
    }
}

/// Narration thresholds and auto-narration timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Seconds between automatic full descriptions
    pub auto_interval_secs: u64,
    /// Start the session with auto-narration enabled
    pub auto_narrate: bool,
    /// Scene clause is spoken only above this confidence (0-100)
    pub scene_confidence_threshold: f32,
    pub condition_confidence_threshold: f32,
    pub activity_confidence_threshold: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            auto_interval_secs: 15,
            auto_narrate: false,
            scene_confidence_threshold: 25.0,
            condition_confidence_threshold: 30.0,
            activity_confidence_threshold: 35.0,
        }
    }
}

/// HTTP inference endpoints for the external models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerEndpoints {
    pub detector_url: Option<String>,
    pub depth_url: Option<String>,
    pub scene_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Detections below this confidence are discarded
    pub min_confidence: f32,
}

impl Default for AnalyzerEndpoints {
    fn default() -> Self {
        Self {
            detector_url: None,
            depth_url: None,
            scene_url: None,
            timeout_secs: 10,
            min_confidence: 0.5,
        }
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DristiConfig {
    pub camera: CameraConfig,
    pub cadence: CadenceConfig,
    pub narration: NarrationConfig,
    pub analyzers: AnalyzerEndpoints,
    pub log_level: Option<String>,
}

impl DristiConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration, trying JSON first and then TOML
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<DristiConfig>(content) {
            return Ok(config);
        }

        toml::from_str::<DristiConfig>(content)
            .map_err(|e| Error::Deserialization(format!("Unrecognised config format: {}", e)))
    }

    /// Apply `DRISTI_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(rate) = std::env::var("DRISTI_FRAME_RATE") {
            if let Ok(r) = rate.parse::<u32>() {
                self.camera.frame_rate = r;
            }
        }

        if let Ok(frames) = std::env::var("DRISTI_FRAMES") {
            self.camera.source = Some(PathBuf::from(frames));
        }

        if let Ok(url) = std::env::var("DRISTI_DETECTOR_URL") {
            self.analyzers.detector_url = Some(url);
        }

        if let Ok(url) = std::env::var("DRISTI_DEPTH_URL") {
            self.analyzers.depth_url = Some(url);
        }

        if let Ok(url) = std::env::var("DRISTI_SCENE_URL") {
            self.analyzers.scene_url = Some(url);
        }

        if let Ok(level) = std::env::var("DRISTI_LOG_LEVEL") {
            self.log_level = Some(level);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.camera.frame_rate == 0 || self.camera.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if !(320..=1280).contains(&self.camera.frame_width) {
            return Err("Frame width must be between 320 and 1280".to_string());
        }

        let intervals = [
            ("detection", self.cadence.detection_interval),
            ("depth", self.cadence.depth_interval),
            ("scene", self.cadence.scene_interval),
        ];
        for (name, interval) in intervals {
            if interval == 0 {
                return Err(format!("{} interval must be at least 1 frame", name));
            }
        }

        if self.narration.auto_interval_secs == 0 {
            return Err("Auto-narration interval must be at least 1 second".to_string());
        }

        for threshold in [
            self.narration.scene_confidence_threshold,
            self.narration.condition_confidence_threshold,
            self.narration.activity_confidence_threshold,
        ] {
            if !(0.0..=100.0).contains(&threshold) {
                return Err("Confidence thresholds must be between 0 and 100".to_string());
            }
        }

        if !(0.0..=1.0).contains(&self.analyzers.min_confidence) {
            return Err("Minimum detection confidence must be between 0.0 and 1.0".to_string());
        }

        if self.analyzers.timeout_secs == 0 || self.analyzers.timeout_secs > 300 {
            return Err("Analyzer timeout must be between 1 and 300 seconds".to_string());
        }

        for url in [
            &self.analyzers.detector_url,
            &self.analyzers.depth_url,
            &self.analyzers.scene_url,
        ]
        .into_iter()
        .flatten()
        {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Analyzer endpoint must be an http(s) URL: {}", url));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = DristiConfig::default();
        assert_eq!(config.camera.frame_rate, 15);
        assert_eq!(config.camera.frame_width, 640);
        assert_eq!(config.cadence.detection_interval, 1);
        assert_eq!(config.cadence.depth_interval, 2);
        assert_eq!(config.cadence.scene_interval, 30);
        assert!(!config.cadence.enable_depth);
        assert!(config.cadence.enable_scene);
        assert_eq!(config.narration.auto_interval_secs, 15);
        assert_eq!(config.narration.scene_confidence_threshold, 25.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = DristiConfig::default();
        config.cadence.scene_interval = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("scene"));
    }

    #[test]
    fn test_config_validation_frame_rate() {
        let mut config = DristiConfig::default();
        config.camera.frame_rate = 0;
        assert!(config.validate().is_err());

        config.camera.frame_rate = 121;
        assert!(config.validate().is_err());

        config.camera.frame_rate = 120;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_frame_width() {
        let mut config = DristiConfig::default();
        config.camera.frame_width = 100;
        assert!(config.validate().is_err());

        config.camera.frame_width = 1280;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_endpoint_scheme() {
        let mut config = DristiConfig::default();
        config.analyzers.detector_url = Some("ftp://models.local/detect".to_string());
        assert!(config.validate().is_err());

        config.analyzers.detector_url = Some("http://127.0.0.1:8500/detect".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_toml_partial() {
        let config = DristiConfig::from_str(
            r#"
            [camera]
            frame_rate = 10

            [cadence]
            scene_interval = 60
            enable_depth = true
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.frame_rate, 10);
        assert_eq!(config.camera.frame_width, 640);
        assert_eq!(config.cadence.scene_interval, 60);
        assert!(config.cadence.enable_depth);
        assert_eq!(config.cadence.detection_interval, 1);
    }

    #[test]
    fn test_from_str_json() {
        let config = DristiConfig::from_str(r#"{"narration": {"auto_interval_secs": 30}}"#).unwrap();
        assert_eq!(config.narration.auto_interval_secs, 30);
    }

    #[test]
    fn test_from_str_garbage() {
        let result = DristiConfig::from_str("camera = [[[");
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        writeln!(file, "[analyzers]").unwrap();
        writeln!(file, "detector_url = \"http://localhost:9000/detect\"").unwrap();

        let config = DristiConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(
            config.analyzers.detector_url.as_deref(),
            Some("http://localhost:9000/detect")
        );
    }

    #[test]
    fn test_from_missing_file() {
        let result = DristiConfig::from_file("/nonexistent/dristi.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
