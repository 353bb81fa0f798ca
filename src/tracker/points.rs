//! Point primitives for the Lucas-Kanade session.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A point after one optical-flow step, with its liveness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub point: Point2<f32>,
    /// `false` once the engine could not follow the point.
    pub status: bool,
}

impl TrackedPoint {
    pub fn new(x: f32, y: f32, status: bool) -> Self {
        Self {
            point: Point2::new(x, y),
            status,
        }
    }
}

/// Motion of one surviving point across a single step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub from: Point2<f32>,
    pub to: Point2<f32>,
}

impl TrackSegment {
    pub fn length(&self) -> f32 {
        nalgebra::distance(&self.from, &self.to)
    }
}

/// Uniform `grid_size` x `grid_size` grid strictly inside `[0, width] x [0, height]`.
///
/// Point `(i, j)` (1-indexed) sits at `(width * i / (n + 1), height * j / (n + 1))`,
/// with `i` varying slowest. Callers bound `grid_size`; the result holds
/// `grid_size * grid_size` points.
pub fn make_grid(grid_size: usize, width: f32, height: f32) -> Vec<Point2<f32>> {
    let denom = grid_size as f32 + 1.0;
    let mut points = Vec::with_capacity(grid_size.checked_mul(grid_size).unwrap_or_default());
    for i in 1..=grid_size {
        for j in 1..=grid_size {
            points.push(Point2::new(
                width * i as f32 / denom,
                height * j as f32 / denom,
            ));
        }
    }
    points
}
