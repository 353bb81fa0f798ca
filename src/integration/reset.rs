//! Reset requests raised by the user and applied between steps.
//!
//! A click or a "reseed" button may fire from any thread. Requests only get
//! queued there; the stepping thread drains the queue before pulling the
//! next frame, so a reset never lands in the middle of a step.

use crossbeam_channel::{Receiver, Sender, unbounded};
use nalgebra::Point2;

use crate::tracker::Rect;

#[derive(Debug, Clone, PartialEq)]
pub enum ResetRequest {
    /// Seed a TLD tracker on an explicit box.
    Region(Rect),
    /// Seed a TLD tracker on a box centered on a click.
    Click { x: f32, y: f32 },
    /// Replace the Lucas-Kanade point set with a uniform grid. Without a
    /// `grid_size` the session's configured density is used.
    Grid {
        width: f32,
        height: f32,
        grid_size: Option<usize>,
    },
    /// Append points to the Lucas-Kanade point set.
    AddPoints(Vec<Point2<f32>>),
    /// Forget what is tracked; keep the cached frame.
    Clear,
}

impl ResetRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::Click { .. } => "click",
            Self::Grid { .. } => "grid",
            Self::AddPoints(_) => "add-points",
            Self::Clear => "clear",
        }
    }
}

/// Cloneable, thread-safe handle for raising reset requests.
#[derive(Debug, Clone)]
pub struct ResetHandle {
    tx: Sender<ResetRequest>,
}

impl ResetHandle {
    /// Queue a request. Returns `false` once the owning queue is gone.
    pub fn request(&self, request: ResetRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

/// Pending requests, owned by whoever drives the session.
#[derive(Debug)]
pub struct ResetQueue {
    tx: Sender<ResetRequest>,
    rx: Receiver<ResetRequest>,
}

impl Default for ResetQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> ResetHandle {
        ResetHandle {
            tx: self.tx.clone(),
        }
    }

    /// Next pending request, without waiting.
    pub fn pop(&self) -> Option<ResetRequest> {
        self.rx.try_recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
