//! HTTP-backed analyzers
//!
//! Each model runs in an external inference service. Frames are posted as
//! base64 JPEG inside a JSON body; replies are plain JSON.

use crate::analyzer::{DepthEstimator, ObjectDetector, SceneClassifier};
use crate::camera::Frame;
use crate::depth::DepthMap;
use crate::error::VisionError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dristi_core::{BoundingBox, Detection};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const JPEG_QUALITY: u8 = 85;

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    image: String,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompts: Option<&'a [&'a str]>,
}

#[derive(Deserialize)]
struct RawDetection {
    name: String,
    confidence: f32,
    bbox: [f32; 4],
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<RawDetection>,
}

#[derive(Deserialize)]
struct DepthResponse {
    width: u32,
    height: u32,
    depth: Vec<f32>,
}

#[derive(Deserialize)]
struct SimilarityResponse {
    similarities: Vec<f32>,
}

/// Shared JSON-over-HTTP plumbing
#[derive(Clone)]
struct RemoteClient {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl RemoteClient {
    fn new(url: &str, timeout: Duration) -> Result<Self, VisionError> {
        let url = Url::parse(url).map_err(|e| VisionError::Config(format!("Invalid endpoint {}: {}", url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(VisionError::Config(format!("Unsupported endpoint scheme: {}", url.scheme())));
        }

        Ok(Self {
            client: Client::new(),
            url,
            timeout,
        })
    }

    async fn post<T>(&self, frame: &Frame, prompts: Option<&[&str]>) -> Result<T, VisionError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = AnalyzeRequest {
            image: STANDARD.encode(frame.to_jpeg(JPEG_QUALITY)?),
            width: frame.width(),
            height: frame.height(),
            prompts,
        };

        let response = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(500).collect();
            return Err(VisionError::Model(format!("HTTP {} from {}: {}", status, self.url, text)));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Object detector served over HTTP
pub struct RemoteDetector {
    remote: RemoteClient,
    min_confidence: f32,
    name: String,
}

impl RemoteDetector {
    pub fn new(url: &str, timeout: Duration, min_confidence: f32) -> Result<Self, VisionError> {
        Ok(Self {
            remote: RemoteClient::new(url, timeout)?,
            min_confidence,
            name: format!("remote-detector({})", url),
        })
    }
}

#[async_trait]
impl ObjectDetector for RemoteDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let response: DetectResponse = self.remote.post(frame, None).await?;
        let total = response.detections.len();

        let detections: Vec<Detection> = response
            .detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                Detection::new(d.name, d.confidence, BoundingBox::new(x1, y1, x2, y2))
            })
            .collect();

        debug!("Detector returned {} objects, kept {}", total, detections.len());
        Ok(detections)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Depth estimator served over HTTP
pub struct RemoteDepthEstimator {
    remote: RemoteClient,
    name: String,
}

impl RemoteDepthEstimator {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, VisionError> {
        Ok(Self {
            remote: RemoteClient::new(url, timeout)?,
            name: format!("remote-depth({})", url),
        })
    }
}

#[async_trait]
impl DepthEstimator for RemoteDepthEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<DepthMap, VisionError> {
        let response: DepthResponse = self.remote.post(frame, None).await?;
        let map = DepthMap::new(response.width, response.height, response.depth)?.normalized();
        if (map.width(), map.height()) != (frame.width(), frame.height()) {
            debug!(
                "Resampling depth map {}x{} to frame {}x{}",
                map.width(),
                map.height(),
                frame.width(),
                frame.height()
            );
        }
        map.resized(frame.width(), frame.height())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Image-text similarity service used for scene classification
pub struct RemoteSceneClassifier {
    remote: RemoteClient,
    name: String,
}

impl RemoteSceneClassifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, VisionError> {
        Ok(Self {
            remote: RemoteClient::new(url, timeout)?,
            name: format!("remote-scene({})", url),
        })
    }
}

#[async_trait]
impl SceneClassifier for RemoteSceneClassifier {
    async fn similarities(&self, frame: &Frame, prompts: &[&str]) -> Result<Vec<f32>, VisionError> {
        let response: SimilarityResponse = self.remote.post(frame, Some(prompts)).await?;
        Ok(response.similarities)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = RemoteDetector::new("not a url", Duration::from_secs(1), 0.5);
        assert!(matches!(result, Err(VisionError::Config(_))));

        let result = RemoteDepthEstimator::new("ftp://models.local/depth", Duration::from_secs(1));
        assert!(matches!(result, Err(VisionError::Config(_))));
    }

    #[test]
    fn test_valid_url_names_adapter() {
        let detector = RemoteDetector::new("http://127.0.0.1:8500/detect", Duration::from_secs(1), 0.5).unwrap();
        assert!(detector.name().contains("127.0.0.1:8500"));
    }

    #[test]
    fn test_request_body_shape() {
        let prompts = ["an indoor room", "a bathroom"];
        let body = AnalyzeRequest {
            image: "abc".to_string(),
            width: 4,
            height: 2,
            prompts: Some(&prompts[..]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["width"], 4);
        assert_eq!(json["prompts"][1], "a bathroom");

        let body = AnalyzeRequest {
            image: "abc".to_string(),
            width: 4,
            height: 2,
            prompts: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("prompts").is_none());
    }

    #[test]
    fn test_detect_response_parses() {
        let response: DetectResponse = serde_json::from_str(
            r#"{"detections": [{"name": "chair", "confidence": 0.8, "bbox": [1, 2, 3, 4]}]}"#,
        )
        .unwrap();
        assert_eq!(response.detections[0].name, "chair");
        assert_eq!(response.detections[0].bbox, [1.0, 2.0, 3.0, 4.0]);
    }

    /// Answer a single POST on a local port with `body`
    async fn serve_once(body: String) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/depth", addr)
    }

    #[tokio::test]
    async fn test_small_depth_map_is_resampled_to_frame() {
        let mut depth = vec![1.0f32; 16];
        depth[0] = 0.0;
        let body = serde_json::json!({"width": 4, "height": 4, "depth": depth}).to_string();
        let url = serve_once(body).await;

        let estimator = RemoteDepthEstimator::new(&url, Duration::from_secs(5)).unwrap();
        let map = estimator.estimate(&Frame::solid(640, 480, [0, 0, 0])).await.unwrap();
        assert_eq!((map.width(), map.height()), (640, 480));

        let mut objects = vec![Detection::new("car", 0.9, BoundingBox::new(320.0, 240.0, 640.0, 480.0))];
        map.annotate(&mut objects);
        assert_eq!(objects[0].distance, Some(dristi_core::DistanceCategory::VeryClose));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let detector = RemoteDetector::new("http://127.0.0.1:1/detect", Duration::from_secs(2), 0.5).unwrap();
        let result = detector.detect(&Frame::solid(8, 8, [0, 0, 0])).await;
        assert!(matches!(result, Err(VisionError::Network(_))));
    }
}
