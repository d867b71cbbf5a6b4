//! Perception aggregator
//!
//! Holds the latest `PerceptionSnapshot`. Readers clone an `Arc` and never
//! observe a half-updated snapshot; publishers build a new snapshot and swap
//! it in whole.

use crate::analyzer::AnalyzerOutput;
use crate::depth::DepthMap;
use chrono::Utc;
use dristi_core::PerceptionSnapshot;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

const FPS_WINDOW: usize = 30;

/// Rolling frames-per-second over the most recent deliveries
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: VecDeque<Instant>,
    capacity: usize,
}

impl FpsMeter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one delivery and return the current rate
    pub fn tick(&mut self, now: Instant) -> f32 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(now);
        self.fps()
    }

    pub fn fps(&self) -> f32 {
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) if self.window.len() > 1 => {
                let elapsed = last.saturating_duration_since(*first).as_secs_f32();
                if elapsed > 0.0 {
                    (self.window.len() - 1) as f32 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(FPS_WINDOW)
    }
}

pub struct PerceptionAggregator {
    snapshot: RwLock<Arc<PerceptionSnapshot>>,
    depth: Mutex<Option<Arc<DepthMap>>>,
    fps: Mutex<FpsMeter>,
}

fn same_map(a: Option<&Arc<DepthMap>>, b: Option<&Arc<DepthMap>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl PerceptionAggregator {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(PerceptionSnapshot::empty())),
            depth: Mutex::new(None),
            fps: Mutex::new(FpsMeter::default()),
        }
    }

    /// Latest snapshot
    pub fn current(&self) -> Arc<PerceptionSnapshot> {
        self.snapshot.read().clone()
    }

    /// Latest normalized depth map, if depth has ever been published
    pub fn depth_map(&self) -> Option<Arc<DepthMap>> {
        self.depth.lock().clone()
    }

    /// Merge one analyzer result produced from frame `frame_index`.
    ///
    /// Object distances are (re)computed from the most recent depth map
    /// whenever either side changes. Annotation runs with no lock held; the
    /// locks only cover copying and swapping the snapshot.
    pub fn publish(&self, frame_index: u64, output: AnalyzerOutput) {
        match output {
            AnalyzerOutput::Objects(mut objects) => {
                trace!("Publishing {} objects from frame {}", objects.len(), frame_index);
                loop {
                    let depth = self.depth_map();
                    if let Some(map) = &depth {
                        map.annotate(&mut objects);
                    }

                    // A depth map published meanwhile means annotating again
                    let installed = self.commit(frame_index, |next| {
                        if !same_map(self.depth.lock().as_ref(), depth.as_ref()) {
                            return false;
                        }
                        next.objects = Arc::new(std::mem::take(&mut objects));
                        next.objects_frame = Some(frame_index);
                        true
                    });
                    if installed {
                        break;
                    }
                }
            }
            AnalyzerOutput::Depth(map) => {
                let map = Arc::new(map);
                *self.depth.lock() = Some(map.clone());

                let seen = self.current().objects.clone();
                let annotated = if seen.is_empty() {
                    seen.clone()
                } else {
                    let mut objects = seen.as_ref().clone();
                    map.annotate(&mut objects);
                    Arc::new(objects)
                };

                self.commit(frame_index, |next| {
                    if !same_map(self.depth.lock().as_ref(), Some(&map)) {
                        trace!("Depth from frame {} superseded", frame_index);
                        return false;
                    }
                    // Objects installed since were annotated with this map already
                    if Arc::ptr_eq(&next.objects, &seen) {
                        next.objects = annotated;
                    }
                    next.depth_frame = Some(frame_index);
                    true
                });
            }
            AnalyzerOutput::Scene(scene) => {
                trace!("Publishing scene '{}' from frame {}", scene.scene_type, frame_index);
                self.commit(frame_index, |next| {
                    next.scene = Some(scene);
                    next.scene_frame = Some(frame_index);
                    true
                });
            }
        }
    }

    /// Copy the current snapshot, apply `update` and swap the copy in, all
    /// under the write lock. Nothing changes when `update` returns false.
    fn commit<F>(&self, frame_index: u64, update: F) -> bool
    where
        F: FnOnce(&mut PerceptionSnapshot) -> bool,
    {
        let mut current = self.snapshot.write();
        let mut next = PerceptionSnapshot::clone(&current);
        if !update(&mut next) {
            return false;
        }

        next.frame_index = next.frame_index.max(frame_index);
        next.timestamp = Utc::now();
        *current = Arc::new(next);
        true
    }

    /// Record a frame delivery and refresh the snapshot's fps
    pub fn record_frame(&self, now: Instant) -> f32 {
        let fps = self.fps.lock().tick(now);

        let mut current = self.snapshot.write();
        let mut next = PerceptionSnapshot::clone(&current);
        next.fps = fps;
        *current = Arc::new(next);
        fps
    }
}

impl Default for PerceptionAggregator {
    fn default() -> Self {
        Self::new()
    }
}
