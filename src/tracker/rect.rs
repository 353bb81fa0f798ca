use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegionFault;

/// Bounding box in TLWH format (top-left x, top-left y, width, height).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square box of side `size` centered on a point, as produced by a
    /// click or tap on the presentation surface.
    #[inline]
    pub fn around(cx: f32, cy: f32, size: f32) -> Self {
        let half = size / 2.0;
        Self::new(cx - half, cy - half, size, size)
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Checks that can be made without looking at a frame.
    pub fn check_extent(&self) -> Result<(), RegionFault> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(RegionFault::NonFinite);
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(RegionFault::Degenerate);
        }
        Ok(())
    }

    /// Full seed validation against the reference frame's dimensions.
    pub fn check_within(&self, frame: FrameSize) -> Result<(), RegionFault> {
        self.check_extent()?;
        let [x1, y1, x2, y2] = self.to_tlbr();
        if x1 < 0.0 || y1 < 0.0 || x2 > frame.width as f32 || y2 > frame.height as f32 {
            return Err(RegionFault::OutOfBounds(frame));
        }
        Ok(())
    }
}

/// Pixel dimensions of a decoded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
