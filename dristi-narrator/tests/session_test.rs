//! End-to-end session tests over a synthetic camera

use async_trait::async_trait;
use dristi_core::{BoundingBox, Detection, DristiConfig};
use dristi_eye::analyzer::CustomDetector;
use dristi_eye::{AnalyzerAdapter, Frame, FrameSource, VisionError};
use dristi_narrator::session::{CLOSED, READY, SHUTTING_DOWN};
use dristi_narrator::{Session, SessionError};
use dristi_spk::{CustomTtsEngine, SpeechChannel, VoiceConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Delivers solid frames at a fixed pace, then fails after `limit` frames
struct SyntheticCamera {
    delivered: u64,
    limit: u64,
    pace: Duration,
    released: Arc<AtomicBool>,
}

impl SyntheticCamera {
    fn new(limit: u64) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let camera = Self {
            delivered: 0,
            limit,
            pace: Duration::from_millis(5),
            released: released.clone(),
        };
        (camera, released)
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn next_frame(&mut self) -> Result<Frame, VisionError> {
        if self.delivered >= self.limit {
            return Err(VisionError::Camera("stream ended".to_string()));
        }
        tokio::time::sleep(self.pace).await;
        self.delivered += 1;
        Ok(Frame::solid(64, 48, [40, 40, 40]))
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

fn recorder() -> (Arc<SpeechChannel>, Arc<Mutex<Vec<String>>>) {
    let spoken = Arc::new(Mutex::new(Vec::new()));
    let sink = spoken.clone();
    let engine = CustomTtsEngine::new("recorder", move |text: &str, _voice: &VoiceConfig| {
        sink.lock().push(text.to_string());
        Ok(())
    });
    (Arc::new(SpeechChannel::new(Arc::new(engine), VoiceConfig::default())), spoken)
}

fn street() -> AnalyzerAdapter {
    AnalyzerAdapter::objects(Arc::new(CustomDetector::new("street", |frame: &Frame| {
        let w = frame.width() as f32;
        Ok(vec![
            Detection::new("car", 0.9, BoundingBox::new(0.0, 0.0, w / 2.0, 20.0)),
            Detection::new("car", 0.8, BoundingBox::new(w / 2.0, 0.0, w, 20.0)),
            Detection::new("person", 0.95, BoundingBox::new(10.0, 10.0, 20.0, 40.0)),
        ])
    })))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_commands_then_quit() {
    let (speech, spoken) = recorder();
    let mut session = Session::new(&DristiConfig::default(), vec![street()], speech).unwrap();
    let (mut camera, released) = SyntheticCamera::new(10_000);
    let (tx, rx) = mpsc::channel(8);

    let commands = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send('h').await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send('x').await.unwrap();
        tx.send('q').await.unwrap();
    });

    let end = session.run(&mut camera, rx).await.unwrap();
    commands.await.unwrap();

    assert!(end.frames > 0);
    assert_eq!(
        end.last_description.as_deref(),
        Some("Hazard alert. Warning! 2 cars detected. Please be careful.")
    );
    assert!(released.load(Ordering::SeqCst));

    let spoken = spoken.lock();
    assert_eq!(spoken.first().map(String::as_str), Some(READY));
    assert_eq!(
        &spoken[spoken.len() - 3..],
        [
            "Hazard alert. Warning! 2 cars detected. Please be careful.",
            SHUTTING_DOWN,
            CLOSED
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_camera_loss_is_fatal() {
    let (speech, spoken) = recorder();
    let mut session = Session::new(&DristiConfig::default(), vec![street()], speech).unwrap();
    let (mut camera, released) = SyntheticCamera::new(12);
    let (_tx, rx) = mpsc::channel(8);

    let err = session.run(&mut camera, rx).await.unwrap_err();
    assert!(matches!(err, SessionError::FrameAcquisition(VisionError::Camera(_))));
    assert_eq!(session.frame_index(), 12);
    assert!(released.load(Ordering::SeqCst));
    assert!(spoken.lock().contains(&"Camera feed lost. Shutting down.".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_closed_input_keeps_frames_flowing() {
    let (speech, _spoken) = recorder();
    let mut session = Session::new(&DristiConfig::default(), Vec::new(), speech).unwrap();
    let (mut camera, _released) = SyntheticCamera::new(20);
    let (tx, rx) = mpsc::channel(1);
    drop(tx);

    let result = session.run(&mut camera, rx).await;
    assert!(result.is_err());
    assert_eq!(session.frame_index(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_narration_during_run() {
    let (speech, spoken) = recorder();
    let mut config = DristiConfig::default();
    config.narration.auto_narrate = true;
    config.narration.auto_interval_secs = 1;

    let mut session = Session::new(&config, vec![street()], speech).unwrap();
    let (mut camera, _released) = SyntheticCamera::new(10_000);
    let (tx, rx) = mpsc::channel(8);

    let commands = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_300)).await;
        tx.send('q').await.unwrap();
    });

    let end = session.run(&mut camera, rx).await.unwrap();
    commands.await.unwrap();

    let full = "Warning! 2 vehicles detected. Important: person detected. 3 total objects in view.";
    assert_eq!(end.last_description.as_deref(), Some(full));
    assert!(spoken.lock().iter().any(|s| s == full));
}
