//! TrackingPipeline for driving a session from a frame source.

use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::tracker::{SessionState, TrackResult};

use super::{FrameSource, ResetHandle, ResetQueue, ResetRequest, ResultSink};

/// Common surface of the TLD and Lucas-Kanade sessions.
pub trait TrackingSession {
    type Frame;

    fn state(&self) -> SessionState;

    /// One tracking step. `None` when the frame was only cached.
    fn step(&mut self, frame: Self::Frame) -> Result<Option<TrackResult>, SessionError>;

    fn apply_reset(&mut self, request: ResetRequest) -> Result<(), SessionError>;

    /// Whether `request` can only be applied together with the next frame,
    /// for instance a seed raised before any frame was cached.
    fn needs_frame(&self, _request: &ResetRequest) -> bool {
        false
    }

    /// Apply `request` with `frame` as its reference frame, in place of a
    /// plain step. The frame is always consumed.
    fn apply_reset_with_frame(
        &mut self,
        request: ResetRequest,
        frame: Self::Frame,
    ) -> Result<Option<TrackResult>, SessionError> {
        let applied = self.apply_reset(request);
        let result = self.step(frame)?;
        applied.map(|()| result)
    }

    fn teardown(&mut self) -> Result<(), SessionError>;
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub emitted: bool,
    pub state: SessionState,
}

/// Totals for a [`TrackingPipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks that completed without error.
    pub ticks: usize,
    pub emitted: usize,
    /// Engine failures the session recovered from by resetting.
    pub engine_resets: usize,
    /// Reset requests the session refused.
    pub rejected_resets: usize,
}

/// Clock-driven driver bundling a session, its frame source and a result sink.
///
/// Each [`tick`](Self::tick) applies queued reset requests, pulls exactly one
/// frame, runs exactly one step, and emits at most one result. Nothing else
/// touches the session while a tick is running.
pub struct TrackingPipeline<S, F, R>
where
    S: TrackingSession,
    F: FrameSource<Frame = S::Frame>,
    R: ResultSink,
{
    session: S,
    source: F,
    sink: R,
    resets: ResetQueue,
    exhausted: bool,
    ticks: usize,
}

impl<S, F, R> TrackingPipeline<S, F, R>
where
    S: TrackingSession,
    F: FrameSource<Frame = S::Frame>,
    R: ResultSink,
{
    pub fn new(session: S, source: F, sink: R) -> Self {
        info!(source = %source.kind(), "tracking pipeline created");
        Self {
            session,
            source,
            sink,
            resets: ResetQueue::new(),
            exhausted: false,
            ticks: 0,
        }
    }

    /// Handle for raising resets from input callbacks, on any thread.
    pub fn reset_handle(&self) -> ResetHandle {
        self.resets.handle()
    }

    /// Queue a reset from the driving thread itself.
    pub fn request_reset(&self, request: ResetRequest) {
        self.resets.handle().request(request);
    }

    /// Run one clock tick.
    ///
    /// A refused reset request is returned before any frame is pulled; the
    /// requests queued after it stay pending for the next tick. A request
    /// that needs a frame is applied on this tick's frame instead of a step,
    /// and the requests behind it wait for the next tick.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.exhausted {
            return Err(SessionError::SourceExhausted);
        }
        let deferred = self.apply_resets()?;

        let Some(frame) = self.source.next_frame() else {
            if let Some(request) = deferred {
                warn!(request = request.name(), "frame source exhausted, reset dropped");
            }
            info!(ticks = self.ticks, "frame source exhausted");
            self.exhausted = true;
            return Err(SessionError::SourceExhausted);
        };
        self.ticks += 1;

        let result = match deferred {
            Some(request) => {
                debug!(request = request.name(), "applying reset on incoming frame");
                self.session.apply_reset_with_frame(request, frame)?
            }
            None => self.session.step(frame)?,
        };
        let emitted = result.is_some();
        if let Some(result) = result {
            self.sink.emit(result);
        }
        Ok(TickOutcome {
            emitted,
            state: self.session.state(),
        })
    }

    /// Drain queued requests up to the first one that needs a frame.
    fn apply_resets(&mut self) -> Result<Option<ResetRequest>, SessionError> {
        while let Some(request) = self.resets.pop() {
            if self.session.needs_frame(&request) {
                return Ok(Some(request));
            }
            debug!(request = request.name(), "applying reset");
            self.session.apply_reset(request)?;
        }
        Ok(None)
    }

    /// Tick until the source runs dry.
    ///
    /// Engine failures and refused resets are logged and counted; the session
    /// has already recovered from them. Only ledger violations stop the run.
    pub fn run(&mut self) -> Result<RunSummary, SessionError> {
        let mut summary = RunSummary::default();
        loop {
            match self.tick() {
                Ok(outcome) => {
                    summary.ticks += 1;
                    summary.emitted += usize::from(outcome.emitted);
                }
                Err(SessionError::SourceExhausted) => return Ok(summary),
                Err(err) if err.forced_reset() => {
                    summary.engine_resets += 1;
                    warn!(error = %err, "session reset after engine failure");
                }
                Err(err) if err.is_rejected_request() => {
                    summary.rejected_resets += 1;
                    warn!(error = %err, "reset request rejected");
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Tear the session down and hand back the sink.
    pub fn shutdown(mut self) -> Result<R, SessionError> {
        self.session.teardown()?;
        Ok(self.sink)
    }
}
