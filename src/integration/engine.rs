//! Capability interface onto the vision engine.

use nalgebra::Point2;

use crate::config::{LkParams, TldParams};
use crate::tracker::{DetectionCounts, FrameSize, Rect, TopCandidate, TrackedPoint};

/// Outcome of one TLD tracking step as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TldStep {
    pub region: Rect,
    pub track_success: bool,
    pub perform_learn: bool,
    pub perform_track: bool,
    pub top_candidates: Vec<TopCandidate>,
    pub counts: DetectionCounts,
}

/// Trait for the native vision engine behind a tracking session.
///
/// Implement this trait to connect any engine that hands out opaque,
/// manually released handles. Sessions never call it directly: every handle
/// passes through a [`ResourceLedger`](crate::ResourceLedger), which pairs
/// each acquisition with exactly one `release_*` call.
///
/// # Example
///
/// ```ignore
/// use tracksession_rs::{VisionEngine, TldStep, FrameSize, Rect, TldParams};
///
/// struct MyEngine { /* native context */ }
///
/// impl VisionEngine for MyEngine {
///     type Frame = NativeImage;
///     type Tracker = NativeTld;
///     type PointSet = NativeArray;
///     type Error = NativeError;
///
///     fn frame_size(&self, frame: &NativeImage) -> FrameSize {
///         FrameSize::new(frame.cols(), frame.rows())
///     }
///     // ...
/// }
/// ```
pub trait VisionEngine {
    /// Decoded pixel data for one instant.
    type Frame;
    /// Learned appearance model plus classifier cascade (TLD).
    type Tracker;
    /// Ordered point array fed to optical flow (Lucas-Kanade).
    type PointSet;
    /// Error type for engine failures.
    type Error: std::error::Error + Send + Sync + 'static;

    fn frame_size(&self, frame: &Self::Frame) -> FrameSize;

    /// Build a tracker for `region` on `reference`.
    fn init_tracker(
        &mut self,
        reference: &Self::Frame,
        region: Rect,
        params: &TldParams,
    ) -> Result<Self::Tracker, Self::Error>;

    /// Advance `tracker` from `previous` to `current`. The tracker's learned
    /// state is updated in place.
    fn track_object(
        &mut self,
        tracker: &mut Self::Tracker,
        previous: &Self::Frame,
        current: &Self::Frame,
    ) -> Result<TldStep, Self::Error>;

    fn alloc_points(&mut self, points: &[Point2<f32>]) -> Result<Self::PointSet, Self::Error>;

    /// Optical flow for every point in `points`, returned in input order.
    fn track_points(
        &mut self,
        previous: &Self::Frame,
        current: &Self::Frame,
        points: &Self::PointSet,
        params: &LkParams,
    ) -> Result<Vec<TrackedPoint>, Self::Error>;

    fn release_frame(&mut self, frame: Self::Frame);

    fn release_tracker(&mut self, tracker: Self::Tracker);

    fn release_points(&mut self, points: Self::PointSet);
}
