//! Integration module connecting tracking sessions to their collaborators.
//!
//! This module provides the traits an engine, a frame source and a
//! presentation layer implement, the reset protocol, and a pipeline that
//! drives a session one clock tick at a time.

mod channel;
mod engine;
mod pipeline;
mod reset;
mod source;

pub use channel::{DEFAULT_HISTORY_LEN, ResultSink, TrackHistory};
pub use engine::{TldStep, VisionEngine};
pub use pipeline::{RunSummary, TickOutcome, TrackingPipeline, TrackingSession};
pub use reset::{ResetHandle, ResetQueue, ResetRequest};
pub use source::{FrameSource, ImgurApi, IterSource, SourceError, SourceKind};
