//! Single-object TLD tracking session.

use tracing::{debug, error, info, warn};

use crate::config::{TldParams, TrackingConfig};
use crate::error::SessionError;
use crate::integration::{ResetRequest, TrackingSession, VisionEngine};
use crate::tracker::ledger::{LedgerStats, Owned, ResourceLedger};
use crate::tracker::rect::Rect;
use crate::tracker::result::{TldResult, TrackResult};
use crate::tracker::track_state::SessionState;

const DEFAULT_SEED_BOX: f32 = 20.0;

/// Follows one object, seeded by a bounding box.
///
/// The session keeps the last frame it saw as the "previous frame" and at
/// most one tracker. `seed` may be called at any time; it discards the old
/// tracker before the new one is built. Any engine failure releases every
/// handle and leaves the session `Unseeded`.
///
/// Every handle lives in a field of the session while the engine runs, so a
/// panicking engine call still leaves them reachable by `teardown`.
pub struct TldSession<E: VisionEngine> {
    resources: ResourceLedger<E>,
    params: TldParams,
    seed_box_size: f32,
    state: SessionState,
    previous: Option<Owned<E::Frame>>,
    /// Frame being stepped; only set for the duration of a step.
    incoming: Option<Owned<E::Frame>>,
    tracker: Option<Owned<E::Tracker>>,
    region: Option<Rect>,
    frame_id: u32,
}

impl<E: VisionEngine> TldSession<E> {
    pub fn new(engine: E, params: TldParams) -> Self {
        Self {
            resources: ResourceLedger::new(engine),
            params,
            seed_box_size: DEFAULT_SEED_BOX,
            state: SessionState::Unseeded,
            previous: None,
            incoming: None,
            tracker: None,
            region: None,
            frame_id: 0,
        }
    }

    pub fn from_config(engine: E, config: &TrackingConfig) -> Self {
        Self::new(engine, config.tld.clone()).with_seed_box_size(config.seed_box_size)
    }

    pub fn with_seed_box_size(mut self, size: f32) -> Self {
        self.seed_box_size = size;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last region reported by the engine, or the seed region right after seeding.
    pub fn region(&self) -> Option<Rect> {
        self.region
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn has_previous_frame(&self) -> bool {
        self.previous.is_some()
    }

    pub fn engine(&self) -> &E {
        self.resources.engine()
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.resources.stats()
    }

    /// Seed on the cached previous frame.
    pub fn seed(&mut self, region: Rect) -> Result<(), SessionError> {
        region
            .check_extent()
            .map_err(|fault| SessionError::InvalidRegion { region, fault })?;
        let size = match self.previous.as_ref() {
            Some(reference) => self.resources.frame_size(reference),
            None => return Err(SessionError::NoReferenceFrame),
        };
        region
            .check_within(size)
            .map_err(|fault| SessionError::InvalidRegion { region, fault })?;
        self.install_tracker(region)
    }

    /// Seed on `frame`, which also becomes the previous frame and counts
    /// towards `frame_id`.
    ///
    /// If the region is rejected the frame is released and the session is
    /// left exactly as it was.
    pub fn seed_with_frame(&mut self, frame: E::Frame, region: Rect) -> Result<(), SessionError> {
        let frame = self.resources.adopt_frame(frame);
        self.release_incoming();
        let incoming = self.incoming.insert(frame);
        let size = self.resources.frame_size(incoming);
        if let Err(fault) = region.check_within(size) {
            self.release_incoming();
            return Err(SessionError::InvalidRegion { region, fault });
        }
        self.frame_id += 1;
        self.promote_incoming();
        self.install_tracker(region)
    }

    /// Seed with a box of the configured size centered on `(x, y)`.
    pub fn seed_at(&mut self, x: f32, y: f32) -> Result<(), SessionError> {
        self.seed(self.click_region(x, y))
    }

    fn click_region(&self, x: f32, y: f32) -> Rect {
        Rect::around(x, y, self.seed_box_size)
    }

    fn install_tracker(&mut self, region: Rect) -> Result<(), SessionError> {
        if let Some(old) = self.tracker.take() {
            self.resources.release_tracker(old);
        }
        self.state = SessionState::Unseeded;
        self.region = None;

        let built = match self.previous.as_ref() {
            Some(reference) => self.resources.init_tracker(reference, region, &self.params),
            None => return Err(SessionError::NoReferenceFrame),
        };
        match built {
            Ok(tracker) => {
                self.tracker = Some(tracker);
                self.state = SessionState::Tracking;
                self.region = Some(region);
                info!(?region, frame_id = self.frame_id, "tld tracker seeded");
                self.verify()
            }
            Err(err) => {
                self.fail_safe_reset();
                Err(SessionError::engine(err))
            }
        }
    }

    /// Advance by one frame.
    ///
    /// While `Unseeded` the frame is only cached and `None` is returned.
    pub fn step(&mut self, frame: E::Frame) -> Result<Option<TldResult>, SessionError> {
        let frame = self.resources.adopt_frame(frame);
        self.frame_id += 1;
        self.release_incoming();
        let incoming = self.incoming.insert(frame);

        let outcome = match (self.tracker.as_mut(), self.previous.as_ref()) {
            (Some(tracker), Some(previous)) if self.state == SessionState::Tracking => {
                Some(self.resources.track_object(tracker, previous, incoming))
            }
            _ => None,
        };
        let Some(outcome) = outcome else {
            debug!(frame_id = self.frame_id, "tld session unseeded, caching frame");
            self.promote_incoming();
            return Ok(None);
        };

        match outcome {
            Ok(step) => {
                self.promote_incoming();
                self.region = Some(step.region);
                debug!(
                    frame_id = self.frame_id,
                    track_success = step.track_success,
                    perform_learn = step.perform_learn,
                    candidates = step.top_candidates.len(),
                    "tld step"
                );
                self.verify()?;
                Ok(Some(TldResult::from_step(self.frame_id, step)))
            }
            Err(err) => {
                self.fail_safe_reset();
                Err(SessionError::engine(err))
            }
        }
    }

    /// Drop the tracker but keep the cached frame for the next seed.
    pub fn clear(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            self.resources.release_tracker(tracker);
        }
        self.state = SessionState::Unseeded;
        self.region = None;
    }

    /// Release every live handle. Safe to call repeatedly.
    pub fn teardown(&mut self) -> Result<(), SessionError> {
        self.release_all();
        self.resources.verify_empty()?;
        Ok(())
    }

    fn cache_previous(&mut self, frame: Owned<E::Frame>) {
        if let Some(old) = self.previous.replace(frame) {
            self.resources.release_frame(old);
        }
    }

    /// The stepped frame becomes the previous frame.
    fn promote_incoming(&mut self) {
        if let Some(frame) = self.incoming.take() {
            self.cache_previous(frame);
        }
    }

    fn release_incoming(&mut self) {
        if let Some(frame) = self.incoming.take() {
            self.resources.release_frame(frame);
        }
    }

    fn release_all(&mut self) {
        self.release_incoming();
        if let Some(tracker) = self.tracker.take() {
            self.resources.release_tracker(tracker);
        }
        if let Some(previous) = self.previous.take() {
            self.resources.release_frame(previous);
        }
        self.state = SessionState::Unseeded;
        self.region = None;
    }

    fn fail_safe_reset(&mut self) {
        warn!(frame_id = self.frame_id, "tld engine failure, resetting session");
        self.release_all();
    }

    fn verify(&self) -> Result<(), SessionError> {
        self.resources.verify().map_err(SessionError::from)
    }
}

impl<E: VisionEngine> TrackingSession for TldSession<E> {
    type Frame = E::Frame;

    fn state(&self) -> SessionState {
        self.state
    }

    fn step(&mut self, frame: E::Frame) -> Result<Option<TrackResult>, SessionError> {
        Ok(TldSession::step(self, frame)?.map(TrackResult::from))
    }

    /// A box seed raised before any frame was cached waits for the next frame.
    fn needs_frame(&self, request: &ResetRequest) -> bool {
        matches!(request, ResetRequest::Region(_) | ResetRequest::Click { .. })
            && self.previous.is_none()
    }

    fn apply_reset_with_frame(
        &mut self,
        request: ResetRequest,
        frame: E::Frame,
    ) -> Result<Option<TrackResult>, SessionError> {
        let region = match request {
            ResetRequest::Region(region) => region,
            ResetRequest::Click { x, y } => self.click_region(x, y),
            other => {
                let applied = self.apply_reset(other);
                let result = TrackingSession::step(self, frame)?;
                return applied.map(|()| result);
            }
        };
        self.seed_with_frame(frame, region)?;
        Ok(None)
    }

    fn apply_reset(&mut self, request: ResetRequest) -> Result<(), SessionError> {
        match request {
            ResetRequest::Region(region) => self.seed(region),
            ResetRequest::Click { x, y } => self.seed_at(x, y),
            ResetRequest::Clear => {
                self.clear();
                Ok(())
            }
            other => Err(SessionError::UnsupportedReset {
                session: "tld",
                request: other.name(),
            }),
        }
    }

    fn teardown(&mut self) -> Result<(), SessionError> {
        TldSession::teardown(self)
    }
}

impl<E: VisionEngine> Drop for TldSession<E> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!(%err, "tld session dropped with a ledger violation");
        }
    }
}
