//! Frames and frame sources
//!
//! Live camera capture is left to the embedding application; this module
//! only defines the frame type, the source contract the session loop reads
//! from, and a replay source backed by a directory of still images.

use crate::error::VisionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dristi_core::CameraConfig;
use image::imageops::FilterType;
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One RGB camera frame, cheap to clone across analyzer tasks
#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
            captured_at: Utc::now(),
        }
    }

    /// Uniform frame of one color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Resize to `width`, keeping aspect ratio. Returns a clone if already that wide.
    pub fn resize_to_width(&self, width: u32) -> Frame {
        if width == 0 || self.width() == width || self.width() == 0 {
            return self.clone();
        }

        let scale = width as f64 / self.width() as f64;
        let height = ((self.height() as f64 * scale).round() as u32).max(1);
        let resized = image::imageops::resize(&*self.image, width, height, FilterType::Triangle);

        Frame {
            image: Arc::new(resized),
            captured_at: self.captured_at,
        }
    }

    /// Encode as JPEG for transport to an inference service
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, VisionError> {
        let mut buf = Vec::new();
        {
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            encoder.encode(
                self.image.as_raw(),
                self.width(),
                self.height(),
                image::ColorType::Rgb8,
            )?;
        }
        Ok(buf)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Source of camera frames for the session loop.
///
/// An error from `next_frame` is fatal to the session. The session may drop
/// a pending `next_frame` when a command arrives; that frame is skipped.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Frame, VisionError>;

    /// Release the underlying device
    fn release(&mut self) {}
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Replays a directory of images at the configured frame rate
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
    loop_source: bool,
    frame_width: u32,
    frame_interval: Duration,
    last_delivery: Option<Instant>,
}

impl ImageSequenceSource {
    /// Open a directory of `.jpg`/`.jpeg`/`.png` files, replayed in name order
    pub fn open(dir: &Path, config: &CameraConfig) -> Result<Self, VisionError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| VisionError::Camera(format!("Failed to open frame directory {:?}: {}", dir, e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(VisionError::Camera(format!("No image frames found in {:?}", dir)));
        }

        let frame_rate = config.frame_rate.max(1);
        info!("Replaying {} frames from {:?} at {}fps", paths.len(), dir, frame_rate);

        Ok(Self {
            paths,
            position: 0,
            loop_source: config.loop_source,
            frame_width: config.frame_width,
            frame_interval: Duration::from_secs_f64(1.0 / frame_rate as f64),
            last_delivery: None,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    async fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if let Some(last) = self.last_delivery {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                tokio::time::sleep(self.frame_interval - elapsed).await;
            }
        }

        if self.position >= self.paths.len() {
            if self.loop_source && !self.paths.is_empty() {
                debug!("Frame sequence exhausted, looping");
                self.position = 0;
            } else {
                return Err(VisionError::Camera("Frame sequence exhausted".to_string()));
            }
        }

        let path = self.paths[self.position].clone();
        self.position += 1;

        let decoded = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgb8()))
            .await
            .map_err(|e| VisionError::Camera(format!("Frame decode task failed: {}", e)))??;

        self.last_delivery = Some(Instant::now());
        Ok(Frame::new(decoded).resize_to_width(self.frame_width))
    }

    fn release(&mut self) {
        self.position = self.paths.len();
        self.loop_source = false;
        info!("Frame source released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str, width: u32, height: u32) {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        img.save(dir.join(name)).unwrap();
    }

    fn fast_config(loop_source: bool) -> CameraConfig {
        CameraConfig {
            frame_rate: 120,
            frame_width: 320,
            source: None,
            loop_source,
        }
    }

    #[test]
    fn test_resize_to_width_keeps_aspect() {
        let frame = Frame::solid(640, 360, [0, 0, 0]);
        let resized = frame.resize_to_width(320);
        assert_eq!(resized.width(), 320);
        assert_eq!(resized.height(), 180);

        let same = frame.resize_to_width(640);
        assert_eq!(same.height(), 360);
    }

    #[test]
    fn test_to_jpeg_produces_jpeg_magic() {
        let frame = Frame::solid(16, 16, [200, 100, 50]);
        let bytes = frame.to_jpeg(85).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_open_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path(), &fast_config(false));
        assert!(matches!(result, Err(VisionError::Camera(_))));
    }

    #[tokio::test]
    async fn test_sequence_replays_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.png", 640, 480);
        write_frame(dir.path(), "a.png", 320, 240);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), &fast_config(false)).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().await.unwrap();
        let second = source.next_frame().await.unwrap();
        assert_eq!((first.width(), first.height()), (320, 240));
        assert_eq!((second.width(), second.height()), (320, 240));

        assert!(source.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_sequence_loops_until_released() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "only.png", 320, 240);

        let mut source = ImageSequenceSource::open(dir.path(), &fast_config(true)).unwrap();
        for _ in 0..3 {
            assert!(source.next_frame().await.is_ok());
        }

        source.release();
        assert!(source.next_frame().await.is_err());
    }
}
