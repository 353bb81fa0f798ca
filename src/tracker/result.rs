//! Per-step results handed to the presentation layer.

use serde::Serialize;

use crate::integration::TldStep;
use crate::tracker::points::{TrackSegment, TrackedPoint};
use crate::tracker::rect::Rect;

/// A ranked detector candidate from the TLD classifier cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopCandidate {
    pub region: Rect,
    /// Classifier confidence, 0..=100 as reported by the engine.
    pub confidence: f32,
    pub neighbors: u32,
}

/// Detector statistics from one TLD step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionCounts {
    pub ferns_detects: u32,
    pub nnc_detects: u32,
    pub clustered_detects: u32,
    pub confident_matches: u32,
    pub close_matches: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TldResult {
    pub frame_id: u32,
    /// Object box after this step. Only meaningful when `track_success` is set.
    pub region: Rect,
    pub track_success: bool,
    pub perform_learn: bool,
    pub perform_track: bool,
    pub top_candidates: Vec<TopCandidate>,
    pub counts: DetectionCounts,
}

impl TldResult {
    pub(crate) fn from_step(frame_id: u32, step: TldStep) -> Self {
        Self {
            frame_id,
            region: step.region,
            track_success: step.track_success,
            perform_learn: step.perform_learn,
            perform_track: step.perform_track,
            top_candidates: step.top_candidates,
            counts: step.counts,
        }
    }

    /// Region to draw for the object, if the tracker is confident in it.
    pub fn found(&self) -> Option<Rect> {
        self.track_success.then_some(self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LkResult {
    pub frame_id: u32,
    /// Every point the engine was asked to follow, in input order.
    pub points: Vec<TrackedPoint>,
    /// One segment per surviving point, from its previous to its new position.
    pub segments: Vec<TrackSegment>,
}

impl LkResult {
    pub fn alive(&self) -> usize {
        self.segments.len()
    }

    pub fn all_lost(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Envelope carried by the result channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrackResult {
    Tld(TldResult),
    LucasKanade(LkResult),
}

impl TrackResult {
    pub fn frame_id(&self) -> u32 {
        match self {
            Self::Tld(r) => r.frame_id,
            Self::LucasKanade(r) => r.frame_id,
        }
    }
}

impl From<TldResult> for TrackResult {
    fn from(result: TldResult) -> Self {
        Self::Tld(result)
    }
}

impl From<LkResult> for TrackResult {
    fn from(result: LkResult) -> Self {
        Self::LucasKanade(result)
    }
}
