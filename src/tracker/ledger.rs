//! Ownership bookkeeping for engine handles.
//!
//! The engine's frames, trackers and point sets are native allocations the
//! engine never frees on its own. A [`ResourceLedger`] owns the engine, wraps
//! every handle it hands out in an [`Owned`] token, and only releases a handle
//! by consuming that token. Since `Owned` is neither `Clone` nor `Copy`, a
//! second release of the same handle does not type-check; the ledger's own
//! id table catches what the type system cannot, namely tokens that outlive
//! their state or come from a different ledger.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Point2;
use thiserror::Error;
use tracing::error;

use crate::config::{LkParams, TldParams};
use crate::integration::{TldStep, VisionEngine};
use crate::tracker::points::TrackedPoint;
use crate::tracker::rect::{FrameSize, Rect};

/// Most handles of one kind a session may hold between operations.
const MAX_LIVE_PER_KIND: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Frame,
    Tracker,
    PointSet,
}

impl HandleKind {
    const ALL: [HandleKind; 3] = [HandleKind::Frame, HandleKind::Tracker, HandleKind::PointSet];
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Frame => "frame",
            Self::Tracker => "tracker",
            Self::PointSet => "point set",
        };
        f.write_str(name)
    }
}

/// An engine handle in the custody of a ledger.
#[derive(Debug)]
pub struct Owned<H> {
    id: HandleId,
    handle: H,
}

impl<H> Owned<H> {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn get(&self) -> &H {
        &self.handle
    }

    pub fn get_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerViolation {
    #[error("{kind} handle {id} released but not live in this ledger")]
    UnknownRelease { kind: HandleKind, id: HandleId },
    #[error("{live} live {kind} handles, at most one allowed")]
    TooManyLive { kind: HandleKind, live: usize },
    #[error("{live} handles still live after teardown")]
    LiveAfterTeardown { live: usize },
}

/// Running totals, used to check that every acquisition was released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub acquired: usize,
    pub released: usize,
    pub live: usize,
}

impl LedgerStats {
    pub fn balanced(&self) -> bool {
        self.acquired == self.released && self.live == 0
    }
}

pub struct ResourceLedger<E: VisionEngine> {
    engine: E,
    live: BTreeMap<HandleId, HandleKind>,
    next_id: u64,
    acquired: usize,
    released: usize,
    violations: Vec<LedgerViolation>,
}

impl<E: VisionEngine> ResourceLedger<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            live: BTreeMap::new(),
            next_id: 0,
            acquired: 0,
            released: 0,
            violations: Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn adopt<H>(&mut self, kind: HandleKind, handle: H) -> Owned<H> {
        self.next_id += 1;
        let id = HandleId(self.next_id);
        self.live.insert(id, kind);
        self.acquired += 1;
        Owned { id, handle }
    }

    fn retire<H>(&mut self, kind: HandleKind, owned: Owned<H>) -> H {
        match self.live.remove(&owned.id) {
            Some(found) if found == kind => self.released += 1,
            Some(found) => {
                // Put the entry back, it belongs to a different handle.
                self.live.insert(owned.id, found);
                self.record(LedgerViolation::UnknownRelease { kind, id: owned.id });
            }
            None => self.record(LedgerViolation::UnknownRelease { kind, id: owned.id }),
        }
        owned.handle
    }

    fn record(&mut self, violation: LedgerViolation) {
        error!(%violation, "resource ledger violation");
        self.violations.push(violation);
    }

    /// Take custody of a frame delivered by a frame source.
    pub fn adopt_frame(&mut self, frame: E::Frame) -> Owned<E::Frame> {
        self.adopt(HandleKind::Frame, frame)
    }

    pub fn frame_size(&self, frame: &Owned<E::Frame>) -> FrameSize {
        self.engine.frame_size(frame.get())
    }

    pub fn init_tracker(
        &mut self,
        reference: &Owned<E::Frame>,
        region: Rect,
        params: &TldParams,
    ) -> Result<Owned<E::Tracker>, E::Error> {
        let tracker = self.engine.init_tracker(reference.get(), region, params)?;
        Ok(self.adopt(HandleKind::Tracker, tracker))
    }

    pub fn track_object(
        &mut self,
        tracker: &mut Owned<E::Tracker>,
        previous: &Owned<E::Frame>,
        current: &Owned<E::Frame>,
    ) -> Result<TldStep, E::Error> {
        self.engine
            .track_object(tracker.get_mut(), previous.get(), current.get())
    }

    pub fn alloc_points(&mut self, points: &[Point2<f32>]) -> Result<Owned<E::PointSet>, E::Error> {
        let set = self.engine.alloc_points(points)?;
        Ok(self.adopt(HandleKind::PointSet, set))
    }

    pub fn track_points(
        &mut self,
        previous: &Owned<E::Frame>,
        current: &Owned<E::Frame>,
        points: &Owned<E::PointSet>,
        params: &LkParams,
    ) -> Result<Vec<TrackedPoint>, E::Error> {
        self.engine
            .track_points(previous.get(), current.get(), points.get(), params)
    }

    pub fn release_frame(&mut self, frame: Owned<E::Frame>) {
        let frame = self.retire(HandleKind::Frame, frame);
        self.engine.release_frame(frame);
    }

    pub fn release_tracker(&mut self, tracker: Owned<E::Tracker>) {
        let tracker = self.retire(HandleKind::Tracker, tracker);
        self.engine.release_tracker(tracker);
    }

    pub fn release_points(&mut self, points: Owned<E::PointSet>) {
        let points = self.retire(HandleKind::PointSet, points);
        self.engine.release_points(points);
    }

    pub fn live(&self, kind: HandleKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            acquired: self.acquired,
            released: self.released,
            live: self.live.len(),
        }
    }

    /// Check the at-rest invariant: no recorded violations and at most one
    /// live handle per kind.
    pub fn verify(&self) -> Result<(), LedgerViolation> {
        if let Some(violation) = self.violations.first() {
            return Err(violation.clone());
        }
        for kind in HandleKind::ALL {
            let live = self.live(kind);
            if live > MAX_LIVE_PER_KIND {
                return Err(LedgerViolation::TooManyLive { kind, live });
            }
        }
        Ok(())
    }

    /// Check that a fully torn down owner left nothing behind.
    pub fn verify_empty(&self) -> Result<(), LedgerViolation> {
        self.verify()?;
        match self.live.len() {
            0 => Ok(()),
            live => Err(LedgerViolation::LiveAfterTeardown { live }),
        }
    }
}
