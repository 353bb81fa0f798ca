//! Result channel from the sessions to the presentation layer.

use std::collections::VecDeque;

use crossbeam_channel::{Sender, TrySendError};
use tracing::warn;

use crate::config::TrackingConfig;
use crate::tracker::{TrackResult, TrackSegment, TrackedPoint};

/// Receives one result per completed step.
///
/// Emission is fire-and-forget: a sink must never block the stepping thread
/// and has no way to push back on the session.
pub trait ResultSink {
    fn emit(&mut self, result: TrackResult);
}

impl ResultSink for Vec<TrackResult> {
    fn emit(&mut self, result: TrackResult) {
        self.push(result);
    }
}

/// Non-blocking hand-off to another thread. Results that do not fit in a
/// bounded channel, or that nobody is listening for, are dropped.
impl ResultSink for Sender<TrackResult> {
    fn emit(&mut self, result: TrackResult) {
        match self.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(frame_id = dropped.frame_id(), "result channel full, dropping result");
            }
            Err(TrySendError::Disconnected(dropped)) => {
                warn!(frame_id = dropped.frame_id(), "result channel closed, dropping result");
            }
        }
    }
}

pub const DEFAULT_HISTORY_LEN: usize = 20;

/// Rolling window of Lucas-Kanade motion for drawing point trails.
///
/// Holds the segment set of the last `capacity` steps, oldest first.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    capacity: usize,
    steps: VecDeque<Vec<TrackSegment>>,
    latest: Vec<TrackedPoint>,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            steps: VecDeque::with_capacity(capacity),
            latest: Vec::new(),
        }
    }

    /// History sized by `history_len`.
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.history_len)
    }

    pub fn push(&mut self, segments: Vec<TrackSegment>) {
        if self.steps.len() == self.capacity {
            self.steps.pop_front();
        }
        self.steps.push_back(segments);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &[TrackSegment]> {
        self.steps.iter().map(Vec::as_slice)
    }

    /// Every point from the most recent step, dead ones included.
    pub fn latest_points(&self) -> &[TrackedPoint] {
        &self.latest
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.latest.clear();
    }
}

impl ResultSink for TrackHistory {
    fn emit(&mut self, result: TrackResult) {
        if let TrackResult::LucasKanade(step) = result {
            self.latest = step.points;
            self.push(step.segments);
        }
    }
}
