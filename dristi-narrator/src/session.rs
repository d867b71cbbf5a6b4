//! Session orchestrator
//!
//! One task drives the frame path: it reads frames, hands them to the
//! cadence scheduler, runs the auto-narration timer and reacts to key
//! commands. Analyzer invocations run on their own tasks and speech renders
//! on the channel's worker, so neither can stall frame delivery.

use crate::commands::{CommandDispatcher, Dispatch};
use crate::error::SessionError;
use crate::policy::{NarrationMode, NarrationPolicy};
use crate::state::NarrationState;
use dristi_core::{DristiConfig, PerceptionSnapshot};
use dristi_eye::{AnalyzerAdapter, CadenceScheduler, Frame, FrameSource, PerceptionAggregator};
use dristi_spk::SpeechChannel;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const READY: &str = "Systems ready. Camera starting.";
pub const SHUTTING_DOWN: &str = "Shutting down.";
pub const CAMERA_LOST: &str = "Camera feed lost. Shutting down.";
pub const CLOSED: &str = "Dristi closed. Thank you.";
pub const LOCATION_PENDING: &str = "Determining location. Please wait.";
pub const SCENE_PENDING: &str = "Still analyzing. Please wait.";

/// Frames between status lines
const STATUS_EVERY: u64 = 30;

const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Summary of a session that ended on the quit command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub frames: u64,
    pub last_description: Option<String>,
}

pub struct Session {
    scheduler: CadenceScheduler,
    speech: Arc<SpeechChannel>,
    policy: NarrationPolicy,
    state: NarrationState,
    dispatcher: CommandDispatcher,
    frame_index: u64,
    flush_timeout: Duration,
    drain_timeout: Duration,
}

impl Session {
    /// Build a session. Must be called within a tokio runtime.
    pub fn new(
        config: &DristiConfig,
        adapters: Vec<AnalyzerAdapter>,
        speech: Arc<SpeechChannel>,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::Config)?;

        let aggregator = Arc::new(PerceptionAggregator::new());
        let scheduler = CadenceScheduler::new(&config.cadence, adapters, aggregator);
        let state = NarrationState::new(
            Duration::from_secs(config.narration.auto_interval_secs),
            config.narration.auto_narrate,
            Instant::now(),
        );

        Ok(Self {
            scheduler,
            speech,
            policy: NarrationPolicy::from(&config.narration),
            state,
            dispatcher: CommandDispatcher::new(),
            frame_index: 0,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    /// How long shutdown waits for pending speech
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// How long shutdown waits for running analyzer invocations
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn state(&self) -> &NarrationState {
        &self.state
    }

    pub fn scheduler(&self) -> &CadenceScheduler {
        &self.scheduler
    }

    pub fn snapshot(&self) -> Arc<PerceptionSnapshot> {
        self.scheduler.aggregator().current()
    }

    /// Run until the quit command or a frame acquisition failure.
    ///
    /// Commands are served ahead of frames. When `input` closes the session
    /// keeps narrating from frames alone.
    pub async fn run<S>(&mut self, source: &mut S, mut input: mpsc::Receiver<char>) -> Result<SessionEnd, SessionError>
    where
        S: FrameSource + ?Sized,
    {
        info!("Session started");
        self.speech.say(READY);
        let mut input_open = true;

        loop {
            tokio::select! {
                biased;
                code = input.recv(), if input_open => match code {
                    Some(code) => {
                        if self.handle_input(code, Instant::now()) {
                            self.shutdown(source, SHUTTING_DOWN).await;
                            return Ok(SessionEnd {
                                frames: self.frame_index,
                                last_description: self.state.last_description().map(str::to_string),
                            });
                        }
                    }
                    None => {
                        debug!("Command input closed");
                        input_open = false;
                    }
                },
                frame = source.next_frame() => match frame {
                    Ok(frame) => self.handle_frame(&frame, Instant::now()),
                    Err(e) => {
                        error!("Frame acquisition failed after {} frames: {}", self.frame_index, e);
                        self.shutdown(source, CAMERA_LOST).await;
                        return Err(SessionError::FrameAcquisition(e));
                    }
                },
            }
        }
    }

    /// Deliver one frame: offer it to the analyzers and run the auto timer
    pub fn handle_frame(&mut self, frame: &Frame, now: Instant) {
        self.frame_index += 1;
        self.scheduler.aggregator().record_frame(now);
        self.scheduler.tick(frame, self.frame_index);

        if self.frame_index % STATUS_EVERY == 0 {
            debug!("{}", self.status_line());
        }

        if self.state.auto_due(now) {
            self.state.mark_auto(now);
            self.narrate(NarrationMode::Full);
        }
    }

    /// Act on one key code. Returns true when the session should end.
    pub fn handle_input(&mut self, code: char, now: Instant) -> bool {
        match self.dispatcher.dispatch(code, now, &mut self.state) {
            Dispatch::Narrate(request) => {
                debug!("Narration requested: {}", request.mode);
                self.narrate(request.mode);
                false
            }
            Dispatch::Announce(text) => {
                self.speech.say(text);
                false
            }
            Dispatch::Quit => true,
            Dispatch::Ignored => false,
        }
    }

    /// Describe the current snapshot in `mode` and speak it without waiting
    pub fn narrate(&mut self, mode: NarrationMode) -> String {
        let snapshot = self.snapshot();

        let text = match self.policy.describe(&snapshot, mode, self.state.last_description()) {
            Some(text) => {
                if mode != NarrationMode::Repeat {
                    self.state.remember(text.clone());
                }
                text
            }
            None => match mode {
                NarrationMode::Location => LOCATION_PENDING.to_string(),
                _ => SCENE_PENDING.to_string(),
            },
        };

        self.speech.say(text.clone());
        text
    }

    /// One-line summary of the session, the text of the video overlay
    pub fn status_line(&self) -> String {
        let snapshot = self.snapshot();
        let mode = if self.state.auto_narrate() {
            "AUTO-NARRATION: ON"
        } else {
            "Listening for commands..."
        };
        let scene = snapshot
            .scene
            .as_ref()
            .map(|s| s.scene_name())
            .unwrap_or("Analyzing...");

        format!(
            "Dristi Active | FPS: {:.1} | {} | Objects: {} | Scene: {}",
            snapshot.fps,
            mode,
            snapshot.objects.len(),
            scene
        )
    }

    async fn shutdown<S>(&mut self, source: &mut S, notice: &str)
    where
        S: FrameSource + ?Sized,
    {
        if !self.speech.flush(self.flush_timeout).await {
            warn!("Pending speech still rendering after {:?}", self.flush_timeout);
        }
        if let Err(e) = self.speech.say_and_wait(notice).await {
            warn!("Failed to speak shutdown notice: {}", e);
        }

        self.scheduler.drain(self.drain_timeout).await;
        source.release();

        if let Err(e) = self.speech.say_and_wait(CLOSED).await {
            warn!("Failed to speak closing notice: {}", e);
        }
        info!("Session ended after {} frames", self.frame_index);
    }
}
