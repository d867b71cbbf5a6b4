//! Custom TTS engine implementation
//! Lets callers plug in their own speech backend

use crate::config::VoiceConfig;
use crate::engines::{TtsEngine, MAX_TEXT_LEN};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type SpeakFuture = Pin<Box<dyn Future<Output = Result<(), SpeechError>> + Send>>;

type SyncSpeakFn = dyn Fn(&str, &VoiceConfig) -> Result<(), SpeechError> + Send + Sync;
type AsyncSpeakFn = dyn Fn(String, VoiceConfig) -> SpeakFuture + Send + Sync;

enum SpeakFn {
    Sync(Arc<SyncSpeakFn>),
    Async(Arc<AsyncSpeakFn>),
}

/// Custom TTS engine wrapper
pub struct CustomTtsEngine {
    name: String,
    speak_fn: SpeakFn,
    is_available_fn: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl CustomTtsEngine {
    /// Create an engine from a synchronous speak function
    pub fn new<F>(name: impl Into<String>, speak_fn: F) -> Self
    where
        F: Fn(&str, &VoiceConfig) -> Result<(), SpeechError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            speak_fn: SpeakFn::Sync(Arc::new(speak_fn)),
            is_available_fn: Arc::new(|| true),
        }
    }

    /// Create an engine whose rendering takes time.
    ///
    /// The returned future is dropped if the utterance is superseded.
    pub fn from_async<F>(name: impl Into<String>, speak_fn: F) -> Self
    where
        F: Fn(String, VoiceConfig) -> SpeakFuture + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            speak_fn: SpeakFn::Async(Arc::new(speak_fn)),
            is_available_fn: Arc::new(|| true),
        }
    }

    pub fn with_availability<F>(mut self, is_available_fn: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_available_fn = Arc::new(is_available_fn);
        self
    }
}

#[async_trait]
impl TtsEngine for CustomTtsEngine {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        if text.len() > MAX_TEXT_LEN {
            return Err(SpeechError::Engine(format!("Text too long (max {} bytes)", MAX_TEXT_LEN)));
        }

        match &self.speak_fn {
            SpeakFn::Sync(f) => f(text, voice),
            SpeakFn::Async(f) => f(text.to_string(), voice.clone()).await,
        }
    }

    fn is_available(&self) -> bool {
        (self.is_available_fn)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_sync_engine_records_text() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let sink = spoken.clone();
        let engine = CustomTtsEngine::new("recorder", move |text: &str, _voice: &VoiceConfig| {
            sink.lock().push(text.to_string());
            Ok(())
        });

        engine.speak("One person detected nearby.", &VoiceConfig::default()).await.unwrap();
        assert_eq!(spoken.lock().as_slice(), ["One person detected nearby."]);
        assert_eq!(engine.name(), "recorder");
    }

    #[tokio::test]
    async fn test_async_engine_and_availability() {
        let engine = CustomTtsEngine::from_async("slow", |_text: String, _voice: VoiceConfig| -> SpeakFuture {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Ok(())
            })
        })
        .with_availability(|| false);

        assert!(!engine.is_available());
        assert!(engine.speak("hello", &VoiceConfig::default()).await.is_ok());
        assert!(engine.speak("", &VoiceConfig::default()).await.is_err());
    }
}
