//! Sparse Lucas-Kanade point tracking session.

use nalgebra::Point2;
use tracing::{debug, error, info, warn};

use crate::config::{LkConfig, LkParams, TrackingConfig};
use crate::error::{RegionFault, SessionError};
use crate::integration::{ResetRequest, TrackingSession, VisionEngine};
use crate::tracker::ledger::{LedgerStats, Owned, ResourceLedger};
use crate::tracker::points::{TrackSegment, make_grid};
use crate::tracker::rect::Rect;
use crate::tracker::result::{LkResult, TrackResult};
use crate::tracker::track_state::SessionState;

/// The engine point set together with the positions it was built from.
struct LivePoints<S> {
    handle: Owned<S>,
    positions: Vec<Point2<f32>>,
}

/// Follows a set of points with pyramidal optical flow.
///
/// After every step the points the engine lost are dropped and the rest form
/// the next point set. When none survive the session falls back to
/// `Unseeded` on its own and waits for a reseed.
///
/// Handles stay in the session's fields while the engine runs and are only
/// retired once the engine call has returned.
pub struct LkSession<E: VisionEngine> {
    resources: ResourceLedger<E>,
    params: LkParams,
    grid_size: usize,
    max_grid_size: usize,
    state: SessionState,
    previous: Option<Owned<E::Frame>>,
    incoming: Option<Owned<E::Frame>>,
    points: Option<LivePoints<E::PointSet>>,
    frame_id: u32,
}

impl<E: VisionEngine> LkSession<E> {
    pub fn new(engine: E, config: LkConfig) -> Self {
        Self {
            resources: ResourceLedger::new(engine),
            params: config.params,
            grid_size: config.grid_size,
            max_grid_size: config.max_grid_size,
            state: SessionState::Unseeded,
            previous: None,
            incoming: None,
            points: None,
            frame_id: 0,
        }
    }

    pub fn from_config(engine: E, config: &TrackingConfig) -> Self {
        Self::new(engine, config.lk.clone())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    /// Positions of the points that will be tracked on the next step.
    pub fn positions(&self) -> &[Point2<f32>] {
        self.points
            .as_ref()
            .map(|live| live.positions.as_slice())
            .unwrap_or(&[])
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

    /// Replace the point set with a `grid_size` x `grid_size` uniform grid.
    ///
    /// `grid_size` must lie in `1..=max_grid_size` from the session's config.
    pub fn reseed(&mut self, width: f32, height: f32, grid_size: usize) -> Result<(), SessionError> {
        let area = Rect::new(0.0, 0.0, width, height);
        area.check_extent()
            .map_err(|fault| SessionError::InvalidRegion { region: area, fault })?;
        if grid_size == 0 || grid_size > self.max_grid_size {
            return Err(SessionError::InvalidGrid(grid_size));
        }
        info!(width, height, grid_size, "lk session reseeded");
        self.replace_points(make_grid(grid_size, width, height))
    }

    /// Reseed with the configured grid density.
    pub fn reseed_default(&mut self, width: f32, height: f32) -> Result<(), SessionError> {
        self.reseed(width, height, self.grid_size)
    }

    /// Append points to whatever is currently tracked.
    pub fn add_points(&mut self, points: &[Point2<f32>]) -> Result<(), SessionError> {
        if points.is_empty() {
            return Ok(());
        }
        if let Some(bad) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(SessionError::InvalidRegion {
                region: Rect::new(bad.x, bad.y, 0.0, 0.0),
                fault: RegionFault::NonFinite,
            });
        }
        let mut positions = self.positions().to_vec();
        positions.extend_from_slice(points);
        debug!(added = points.len(), total = positions.len(), "lk points added");
        self.replace_points(positions)
    }

    fn replace_points(&mut self, positions: Vec<Point2<f32>>) -> Result<(), SessionError> {
        if let Some(old) = self.points.take() {
            self.resources.release_points(old.handle);
        }
        self.state = SessionState::Unseeded;

        match self.resources.alloc_points(&positions) {
            Ok(handle) => {
                self.points = Some(LivePoints { handle, positions });
                self.state = SessionState::Tracking;
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
    /// Without a live point set, or without a previous frame to flow from,
    /// the frame is only cached and `None` is returned.
    pub fn step(&mut self, frame: E::Frame) -> Result<Option<LkResult>, SessionError> {
        let frame = self.resources.adopt_frame(frame);
        self.frame_id += 1;
        self.release_incoming();
        let incoming = self.incoming.insert(frame);

        let outcome = match (self.points.as_ref(), self.previous.as_ref()) {
            (Some(live), Some(previous)) if self.state == SessionState::Tracking => Some(
                self.resources
                    .track_points(previous, incoming, &live.handle, &self.params),
            ),
            _ => None,
        };
        let Some(outcome) = outcome else {
            debug!(frame_id = self.frame_id, "lk session idle, caching frame");
            self.promote_incoming();
            return Ok(None);
        };

        // The flow step consumed the point set and the previous frame.
        let positions = match self.points.take() {
            Some(live) => {
                self.resources.release_points(live.handle);
                live.positions
            }
            None => Vec::new(),
        };
        if let Some(previous) = self.previous.take() {
            self.resources.release_frame(previous);
        }

        let tracked = match outcome {
            Ok(tracked) if tracked.len() == positions.len() => tracked,
            Ok(tracked) => {
                self.fail_safe_reset();
                return Err(SessionError::MalformedEngineOutput {
                    expected: positions.len(),
                    got: tracked.len(),
                });
            }
            Err(err) => {
                self.fail_safe_reset();
                return Err(SessionError::engine(err));
            }
        };

        let segments: Vec<TrackSegment> = positions
            .iter()
            .zip(&tracked)
            .filter(|(_, p)| p.status)
            .map(|(from, p)| TrackSegment {
                from: *from,
                to: p.point,
            })
            .collect();
        let survivors: Vec<Point2<f32>> = segments.iter().map(|s| s.to).collect();

        self.promote_incoming();
        self.state = SessionState::Unseeded;
        debug!(
            frame_id = self.frame_id,
            tracked = tracked.len(),
            alive = survivors.len(),
            "lk step"
        );

        if survivors.is_empty() {
            info!(frame_id = self.frame_id, "all points lost, lk session unseeded");
        } else {
            match self.resources.alloc_points(&survivors) {
                Ok(handle) => {
                    self.points = Some(LivePoints {
                        handle,
                        positions: survivors,
                    });
                    self.state = SessionState::Tracking;
                }
                Err(err) => {
                    self.fail_safe_reset();
                    return Err(SessionError::engine(err));
                }
            }
        }

        self.verify()?;
        Ok(Some(LkResult {
            frame_id: self.frame_id,
            points: tracked,
            segments,
        }))
    }

    /// Drop the point set but keep the cached frame.
    pub fn clear(&mut self) {
        if let Some(live) = self.points.take() {
            self.resources.release_points(live.handle);
        }
        self.state = SessionState::Unseeded;
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
        if let Some(live) = self.points.take() {
            self.resources.release_points(live.handle);
        }
        if let Some(previous) = self.previous.take() {
            self.resources.release_frame(previous);
        }
        self.state = SessionState::Unseeded;
    }

    fn fail_safe_reset(&mut self) {
        warn!(frame_id = self.frame_id, "lk engine failure, resetting session");
        self.release_all();
    }

    fn verify(&self) -> Result<(), SessionError> {
        self.resources.verify().map_err(SessionError::from)
    }
}

impl<E: VisionEngine> TrackingSession for LkSession<E> {
    type Frame = E::Frame;

    fn state(&self) -> SessionState {
        self.state
    }

    fn step(&mut self, frame: E::Frame) -> Result<Option<TrackResult>, SessionError> {
        Ok(LkSession::step(self, frame)?.map(TrackResult::from))
    }

    fn apply_reset(&mut self, request: ResetRequest) -> Result<(), SessionError> {
        match request {
            ResetRequest::Grid {
                width,
                height,
                grid_size,
            } => self.reseed(width, height, grid_size.unwrap_or(self.grid_size)),
            ResetRequest::AddPoints(points) => self.add_points(&points),
            ResetRequest::Clear => {
                self.clear();
                Ok(())
            }
            other => Err(SessionError::UnsupportedReset {
                session: "lucas-kanade",
                request: other.name(),
            }),
        }
    }

    fn teardown(&mut self) -> Result<(), SessionError> {
        LkSession::teardown(self)
    }
}

impl<E: VisionEngine> Drop for LkSession<E> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!(%err, "lk session dropped with a ledger violation");
        }
    }
}
