//! Stateful tracking sessions driven one frame at a time.
//!
//! Two session variants share the same shape: a TLD session that follows a
//! single bounding box, and a Lucas-Kanade session that follows a grid of
//! points. Both own their engine handles through a [`ResourceLedger`] so
//! every frame, tracker and point set is released exactly once.

pub mod config;
pub mod error;
pub mod integration;
pub mod tracker;

pub use config::{
    ConfigError, LkConfig, LkParams, TldParams, TrackingConfig, WindowSize, load_config,
};
pub use error::{RegionFault, SessionError};
pub use integration::{
    FrameSource, IterSource, ResetHandle, ResetQueue, ResetRequest, ResultSink, RunSummary,
    SourceKind, TickOutcome, TldStep, TrackHistory, TrackingPipeline, TrackingSession,
    VisionEngine,
};
pub use tracker::{
    FrameSize, LkResult, LkSession, Rect, ResourceLedger, SessionState, TldResult, TldSession,
    TrackResult, TrackSegment, TrackedPoint, make_grid,
};
