//! Cadence scheduler
//!
//! Each analyzer kind owns one slot. On every frame the scheduler starts an
//! invocation for each kind whose interval divides the frame index and whose
//! slot is idle. Invocations run on their own tasks; the frame path never
//! waits for them.

use crate::aggregator::PerceptionAggregator;
use crate::analyzer::AnalyzerAdapter;
use crate::camera::Frame;
use dristi_core::{AnalyzerKind, CadenceConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    InFlight { frame_index: u64 },
    Disabled,
}

/// Invocation state for one analyzer kind
#[derive(Debug, Clone)]
pub struct AnalyzerSlot {
    kind: AnalyzerKind,
    interval: u64,
    state: SlotState,
    last_started: Option<u64>,
    last_completed: Option<u64>,
    invocations: u64,
}

impl AnalyzerSlot {
    pub fn new(kind: AnalyzerKind, interval: u64) -> Self {
        Self {
            kind,
            interval: interval.max(1),
            state: SlotState::Idle,
            last_started: None,
            last_completed: None,
            invocations: 0,
        }
    }

    pub fn disabled(kind: AnalyzerKind, interval: u64) -> Self {
        Self {
            state: SlotState::Disabled,
            ..Self::new(kind, interval)
        }
    }

    pub fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn last_started(&self) -> Option<u64> {
        self.last_started
    }

    pub fn last_completed(&self) -> Option<u64> {
        self.last_completed
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Whether an invocation would start on `frame_index`
    pub fn is_due(&self, frame_index: u64) -> bool {
        self.state == SlotState::Idle && frame_index % self.interval == 0
    }

    /// Move to in-flight if due. Returns false if the frame is skipped.
    pub fn try_begin(&mut self, frame_index: u64) -> bool {
        if !self.is_due(frame_index) {
            return false;
        }
        self.state = SlotState::InFlight { frame_index };
        self.last_started = Some(frame_index);
        self.invocations += 1;
        true
    }

    /// Return to idle after the result has been published
    pub fn complete(&mut self) {
        if let SlotState::InFlight { frame_index } = self.state {
            self.last_completed = Some(frame_index);
            self.state = SlotState::Idle;
        }
    }

    pub fn disable(&mut self) {
        self.state = SlotState::Disabled;
    }
}

type Slots = Arc<Mutex<[AnalyzerSlot; 3]>>;

pub struct CadenceScheduler {
    slots: Slots,
    adapters: [Option<AnalyzerAdapter>; 3],
    aggregator: Arc<PerceptionAggregator>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl CadenceScheduler {
    /// Build slots from cadence settings and the available adapters.
    ///
    /// Kinds without an available adapter, or switched off in `config`,
    /// start disabled and are never invoked.
    pub fn new(
        config: &CadenceConfig,
        adapters: Vec<AnalyzerAdapter>,
        aggregator: Arc<PerceptionAggregator>,
    ) -> Self {
        let mut by_kind: [Option<AnalyzerAdapter>; 3] = [None, None, None];
        for adapter in adapters {
            let idx = adapter.kind().index();
            by_kind[idx] = Some(adapter);
        }

        let interval_for = |kind: AnalyzerKind| match kind {
            AnalyzerKind::Objects => config.detection_interval,
            AnalyzerKind::Depth => config.depth_interval,
            AnalyzerKind::Scene => config.scene_interval,
        };
        let enabled_for = |kind: AnalyzerKind| match kind {
            AnalyzerKind::Objects => true,
            AnalyzerKind::Depth => config.enable_depth,
            AnalyzerKind::Scene => config.enable_scene,
        };

        let slots = AnalyzerKind::ALL.map(|kind| {
            let interval = interval_for(kind);
            let usable = match &by_kind[kind.index()] {
                Some(adapter) if adapter.is_available() => true,
                Some(adapter) => {
                    warn!(
                        "{} analyzer disabled: {}",
                        kind,
                        adapter.unavailable_reason().unwrap_or("unavailable")
                    );
                    false
                }
                None => {
                    if enabled_for(kind) {
                        warn!("{} analyzer disabled: no adapter configured", kind);
                    }
                    false
                }
            };

            if usable && enabled_for(kind) {
                info!("{} analyzer every {} frame(s)", kind, interval.max(1));
                AnalyzerSlot::new(kind, interval)
            } else {
                AnalyzerSlot::disabled(kind, interval)
            }
        });

        let (in_flight, _) = watch::channel(0usize);

        Self {
            slots: Arc::new(Mutex::new(slots)),
            adapters: by_kind,
            aggregator,
            in_flight: Arc::new(in_flight),
        }
    }

    pub fn aggregator(&self) -> &Arc<PerceptionAggregator> {
        &self.aggregator
    }

    /// Offer a frame to every analyzer. Returns the kinds started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn tick(&self, frame: &Frame, frame_index: u64) -> Vec<AnalyzerKind> {
        let mut started = Vec::new();

        for kind in AnalyzerKind::ALL {
            let idx = kind.index();
            let adapter = match &self.adapters[idx] {
                Some(adapter) => adapter.clone(),
                None => continue,
            };

            if !self.slots.lock()[idx].try_begin(frame_index) {
                continue;
            }

            self.in_flight.send_modify(|n| *n += 1);
            started.push(kind);

            let slots = self.slots.clone();
            let aggregator = self.aggregator.clone();
            let in_flight = self.in_flight.clone();
            let frame = frame.clone();

            tokio::spawn(async move {
                match adapter.invoke(&frame).await {
                    Ok(output) => {
                        aggregator.publish(frame_index, output);
                        slots.lock()[idx].complete();
                    }
                    Err(e) => {
                        warn!("{} analyzer failed on frame {}, disabling: {}", kind, frame_index, e);
                        slots.lock()[idx].disable();
                    }
                }
                in_flight.send_modify(|n| *n = n.saturating_sub(1));
            });
        }

        if !started.is_empty() {
            debug!("Frame {}: started {:?}", frame_index, started);
        }
        started
    }

    /// Copy of the slot for `kind`
    pub fn slot(&self, kind: AnalyzerKind) -> AnalyzerSlot {
        self.slots.lock()[kind.index()].clone()
    }

    /// Number of invocations currently running
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait for outstanding invocations. Returns false on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut rx = self.in_flight.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);

        if !drained {
            warn!("{} analyzer invocation(s) still running after {:?}", self.in_flight(), timeout);
        }
        drained
    }
}
