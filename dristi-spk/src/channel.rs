//! Non-blocking speech channel
//!
//! A single-slot mailbox sits between callers and the TTS engine. A worker
//! task renders whatever is in the slot. A newer utterance replaces a pending
//! one and cuts off the one being rendered, so at most one render is active
//! and speech never backs up behind rapid commands.

use crate::config::{SpeechConfig, TtsBackend, VoiceConfig};
use crate::engines::console::ConsoleTtsEngine;
use crate::engines::native::NativeTtsEngine;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Slot contents. `text: None` clears the slot and stops the active render.
#[derive(Debug, Clone, Default)]
struct Message {
    seq: u64,
    text: Option<String>,
}

pub struct SpeechChannel {
    engine: Arc<dyn TtsEngine>,
    voice: VoiceConfig,
    muted: bool,
    slot: watch::Sender<Message>,
    /// Highest sequence number the worker has finished with
    finished: Arc<watch::Sender<u64>>,
    render_lock: Arc<AsyncMutex<()>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechChannel {
    /// Start a channel over `engine`. Must be called within a tokio runtime.
    pub fn new(engine: Arc<dyn TtsEngine>, voice: VoiceConfig) -> Self {
        Self::start(engine, voice, false)
    }

    /// Build the engine named in `config`, falling back to the console
    /// engine when native speech is unavailable.
    pub fn from_config(config: &SpeechConfig) -> Self {
        let engine: Arc<dyn TtsEngine> = match config.engine {
            TtsBackend::Native => {
                let native = NativeTtsEngine::new_with_config(config.rate, config.volume);
                if native.is_available() {
                    Arc::new(native)
                } else {
                    warn!("Native speech unavailable, printing utterances instead");
                    Arc::new(ConsoleTtsEngine::new())
                }
            }
            TtsBackend::Console => Arc::new(ConsoleTtsEngine::new()),
        };

        Self::start(engine, config.voice.clone(), !config.enabled)
    }

    fn start(engine: Arc<dyn TtsEngine>, voice: VoiceConfig, muted: bool) -> Self {
        let (slot, rx) = watch::channel(Message::default());
        let (finished, _) = watch::channel(0u64);
        let finished = Arc::new(finished);
        let render_lock = Arc::new(AsyncMutex::new(()));

        let worker = tokio::spawn(run_worker(
            engine.clone(),
            voice.clone(),
            rx,
            finished.clone(),
            render_lock.clone(),
        ));

        info!("Speech channel ready ({}{})", engine.name(), if muted { ", muted" } else { "" });

        Self {
            engine,
            voice,
            muted,
            slot,
            finished,
            render_lock,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Queue `text` and return immediately. Replaces any pending utterance
    /// and interrupts the one currently rendering.
    pub fn say(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }

        info!("🔊 Dristi: {}", text);
        if self.muted {
            return;
        }

        self.slot.send_modify(|msg| {
            if let Some(previous) = msg.text.take() {
                debug!("Superseded pending utterance: {}", previous);
            }
            msg.seq += 1;
            msg.text = Some(text);
        });
    }

    /// Speak `text` and return once it has been rendered.
    ///
    /// Any non-blocking utterance is cut off first; blocking renders are
    /// serialized with each other.
    pub async fn say_and_wait(&self, text: &str) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        info!("🔊 Dristi: {}", text);
        if self.muted {
            return Ok(());
        }

        self.slot.send_modify(|msg| {
            msg.seq += 1;
            msg.text = None;
        });

        let _guard = self.render_lock.lock().await;
        self.engine.speak(text, &self.voice).await
    }

    /// `speak(text, blocking)` in one call
    pub async fn speak(&self, text: &str, blocking: bool) -> Result<(), SpeechError> {
        if blocking {
            self.say_and_wait(text).await
        } else {
            self.say(text);
            Ok(())
        }
    }

    /// Wait until everything submitted so far has been rendered or
    /// superseded. Returns false on timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let target = self.slot.borrow().seq;
        let mut rx = self.finished.subscribe();

        tokio::time::timeout(timeout, rx.wait_for(|done| *done >= target))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
    }

    /// Stop the worker, cutting off any active render
    pub fn close(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
    }
}

impl Drop for SpeechChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_worker(
    engine: Arc<dyn TtsEngine>,
    voice: VoiceConfig,
    mut rx: watch::Receiver<Message>,
    finished: Arc<watch::Sender<u64>>,
    render_lock: Arc<AsyncMutex<()>>,
) {
    let mut next: Option<Message> = None;

    loop {
        let msg = match next.take() {
            Some(msg) => msg,
            None => {
                if rx.changed().await.is_err() {
                    break;
                }
                rx.borrow_and_update().clone()
            }
        };

        let text = match msg.text {
            Some(text) => text,
            None => {
                finished.send_replace(msg.seq);
                continue;
            }
        };

        let guard = tokio::select! {
            biased;
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Superseded before rendering: {}", text);
                next = Some(rx.borrow_and_update().clone());
                finished.send_replace(msg.seq);
                continue;
            }
            guard = render_lock.lock() => guard,
        };

        tokio::select! {
            biased;
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!("Interrupted: {}", text);
                next = Some(rx.borrow_and_update().clone());
            }
            result = engine.speak(&text, &voice) => {
                if let Err(e) = result {
                    warn!("Speech engine {} failed: {}", engine.name(), e);
                }
            }
        }

        drop(guard);
        finished.send_replace(msg.seq);
    }

    debug!("Speech worker stopped");
}
