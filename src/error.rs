//! Error taxonomy shared by both session variants.

use thiserror::Error;

use crate::tracker::{FrameSize, LedgerViolation, Rect};

/// Boxed error coming out of a [`VisionEngine`](crate::VisionEngine) call.
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a seed region was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RegionFault {
    #[error("region has zero or negative extent")]
    Degenerate,
    #[error("region has non-finite coordinates")]
    NonFinite,
    #[error("region does not fit inside a {0} frame")]
    OutOfBounds(FrameSize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Rejected before any engine call; the session is unchanged.
    #[error("invalid seed region {region:?}: {fault}")]
    InvalidRegion { region: Rect, fault: RegionFault },

    #[error("grid density {0} is outside the allowed range")]
    InvalidGrid(usize),

    /// A TLD seed was requested before any frame was cached.
    #[error("no reference frame available for seeding")]
    NoReferenceFrame,

    #[error("{session} session cannot apply a {request} reset")]
    UnsupportedReset {
        session: &'static str,
        request: &'static str,
    },

    /// The engine failed. The session has already released every handle
    /// and is back in `Unseeded`.
    #[error("tracking engine error")]
    TrackingEngine(#[source] EngineError),

    /// The engine answered with a result that does not line up with its input.
    #[error("engine returned {got} points for {expected} inputs")]
    MalformedEngineOutput { expected: usize, got: usize },

    #[error("frame source exhausted")]
    SourceExhausted,

    #[error("resource leak invariant violated: {0}")]
    ResourceLeakInvariantViolation(#[from] LedgerViolation),
}

impl SessionError {
    pub(crate) fn engine<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TrackingEngine(Box::new(err))
    }

    /// Whether the session was reset as a consequence of this error.
    pub fn forced_reset(&self) -> bool {
        matches!(
            self,
            Self::TrackingEngine(_) | Self::MalformedEngineOutput { .. }
        )
    }

    /// A seed or reset request was refused; the caller may retry with
    /// different input.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion { .. }
                | Self::InvalidGrid(_)
                | Self::NoReferenceFrame
                | Self::UnsupportedReset { .. }
        )
    }
}
