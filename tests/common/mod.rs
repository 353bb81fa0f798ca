#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use nalgebra::Point2;
use tracksession_rs::{
    FrameSize, LkParams, Rect, TldParams, TldStep, TrackedPoint, VisionEngine,
};

pub type SharedLog = Rc<RefCell<EngineLog>>;

/// Everything the mock engine and its frame factory did, kept alive past the
/// session so leaks can be checked after drop.
#[derive(Debug, Default)]
pub struct EngineLog {
    next_id: u64,
    pub created: BTreeSet<u64>,
    pub released: Vec<u64>,
    pub trackers: Vec<u64>,
    pub point_sets: Vec<u64>,
    pub init_calls: usize,
    pub track_calls: usize,
    pub flow_calls: usize,
    pub alloc_calls: usize,
    /// The next fallible engine call fails, whatever its kind.
    pub fail_next: bool,
}

impl EngineLog {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.created.insert(self.next_id);
        self.next_id
    }

    /// Handles created but never released.
    pub fn live(&self) -> usize {
        let released: BTreeSet<u64> = self.released.iter().copied().collect();
        self.created.difference(&released).count()
    }

    pub fn live_of(&self, ids: &[u64]) -> usize {
        ids.iter().filter(|id| !self.released.contains(id)).count()
    }

    pub fn double_released(&self) -> bool {
        let unique: BTreeSet<u64> = self.released.iter().copied().collect();
        unique.len() != self.released.len()
    }

    pub fn was_released(&self, id: u64) -> bool {
        self.released.contains(&id)
    }

    pub fn engine_calls(&self) -> usize {
        self.init_calls + self.track_calls + self.flow_calls + self.alloc_calls
    }
}

pub fn new_log() -> SharedLog {
    Rc::new(RefCell::new(EngineLog::default()))
}

#[derive(Debug)]
pub struct MockFrame {
    pub id: u64,
    pub size: FrameSize,
}

pub fn frame(log: &SharedLog) -> MockFrame {
    frame_sized(log, 320, 240)
}

pub fn frame_sized(log: &SharedLog, width: u32, height: u32) -> MockFrame {
    MockFrame {
        id: log.borrow_mut().next_id(),
        size: FrameSize::new(width, height),
    }
}

pub fn frames(log: &SharedLog, count: usize) -> Vec<MockFrame> {
    (0..count).map(|_| frame(log)).collect()
}

#[derive(Debug)]
pub struct MockTracker {
    pub id: u64,
    pub region: Rect,
}

#[derive(Debug)]
pub struct MockPoints {
    pub id: u64,
    pub points: Vec<Point2<f32>>,
}

#[derive(Debug, thiserror::Error)]
#[error("mock engine: {0}")]
pub struct MockError(&'static str);

pub enum TldPlan {
    Step(TldStep),
    Fail,
    Panic,
}

pub enum FlowPlan {
    /// Every point moves by the offset and stays alive.
    Shift(f32, f32),
    /// Points keep their position; status taken from the list.
    Statuses(Vec<bool>),
    /// One point fewer than requested.
    Truncate,
    Fail,
    Panic,
}

/// Scripted engine. With nothing scripted, TLD steps report success at the
/// tracker's current region and optical flow moves every point by (1, 0).
pub struct MockEngine {
    log: SharedLog,
    tld: VecDeque<TldPlan>,
    flow: VecDeque<FlowPlan>,
    fail_init: bool,
    fail_alloc_from: Option<usize>,
}

impl MockEngine {
    pub fn new(log: &SharedLog) -> Self {
        Self {
            log: Rc::clone(log),
            tld: VecDeque::new(),
            flow: VecDeque::new(),
            fail_init: false,
            fail_alloc_from: None,
        }
    }

    pub fn with_tld(mut self, plans: impl IntoIterator<Item = TldPlan>) -> Self {
        self.tld.extend(plans);
        self
    }

    pub fn with_flow(mut self, plans: impl IntoIterator<Item = FlowPlan>) -> Self {
        self.flow.extend(plans);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Fail the `n`-th allocation (1-based) and every one after it.
    pub fn failing_alloc_from(mut self, n: usize) -> Self {
        self.fail_alloc_from = Some(n);
        self
    }
}

impl MockEngine {
    fn injected_failure(&self) -> Result<(), MockError> {
        if std::mem::take(&mut self.log.borrow_mut().fail_next) {
            return Err(MockError("injected failure"));
        }
        Ok(())
    }
}

impl VisionEngine for MockEngine {
    type Frame = MockFrame;
    type Tracker = MockTracker;
    type PointSet = MockPoints;
    type Error = MockError;

    fn frame_size(&self, frame: &MockFrame) -> FrameSize {
        frame.size
    }

    fn init_tracker(
        &mut self,
        _reference: &MockFrame,
        region: Rect,
        _params: &TldParams,
    ) -> Result<MockTracker, MockError> {
        self.log.borrow_mut().init_calls += 1;
        self.injected_failure()?;
        let mut log = self.log.borrow_mut();
        if self.fail_init {
            return Err(MockError("tracker init failed"));
        }
        let id = log.next_id();
        log.trackers.push(id);
        Ok(MockTracker { id, region })
    }

    fn track_object(
        &mut self,
        tracker: &mut MockTracker,
        _previous: &MockFrame,
        _current: &MockFrame,
    ) -> Result<TldStep, MockError> {
        self.log.borrow_mut().track_calls += 1;
        self.injected_failure()?;
        match self.tld.pop_front() {
            Some(TldPlan::Fail) => Err(MockError("tld step failed")),
            Some(TldPlan::Panic) => panic!("tld step panicked"),
            Some(TldPlan::Step(step)) => {
                tracker.region = step.region;
                Ok(step)
            }
            None => Ok(TldStep {
                region: tracker.region,
                track_success: true,
                perform_track: true,
                ..TldStep::default()
            }),
        }
    }

    fn alloc_points(&mut self, points: &[Point2<f32>]) -> Result<MockPoints, MockError> {
        self.log.borrow_mut().alloc_calls += 1;
        self.injected_failure()?;
        let mut log = self.log.borrow_mut();
        if self.fail_alloc_from.is_some_and(|n| log.alloc_calls >= n) {
            return Err(MockError("point allocation failed"));
        }
        let id = log.next_id();
        log.point_sets.push(id);
        Ok(MockPoints {
            id,
            points: points.to_vec(),
        })
    }

    fn track_points(
        &mut self,
        _previous: &MockFrame,
        _current: &MockFrame,
        points: &MockPoints,
        _params: &LkParams,
    ) -> Result<Vec<TrackedPoint>, MockError> {
        self.log.borrow_mut().flow_calls += 1;
        self.injected_failure()?;
        let shift = |dx: f32, dy: f32| {
            points
                .points
                .iter()
                .map(|p| TrackedPoint::new(p.x + dx, p.y + dy, true))
                .collect::<Vec<_>>()
        };
        match self.flow.pop_front() {
            None => Ok(shift(1.0, 0.0)),
            Some(FlowPlan::Shift(dx, dy)) => Ok(shift(dx, dy)),
            Some(FlowPlan::Statuses(statuses)) => Ok(points
                .points
                .iter()
                .zip(statuses)
                .map(|(p, status)| TrackedPoint::new(p.x, p.y, status))
                .collect()),
            Some(FlowPlan::Truncate) => {
                let mut tracked = shift(0.0, 0.0);
                tracked.pop();
                Ok(tracked)
            }
            Some(FlowPlan::Fail) => Err(MockError("optical flow failed")),
            Some(FlowPlan::Panic) => panic!("optical flow panicked"),
        }
    }

    fn release_frame(&mut self, frame: MockFrame) {
        self.log.borrow_mut().released.push(frame.id);
    }

    fn release_tracker(&mut self, tracker: MockTracker) {
        self.log.borrow_mut().released.push(tracker.id);
    }

    fn release_points(&mut self, points: MockPoints) {
        self.log.borrow_mut().released.push(points.id);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
