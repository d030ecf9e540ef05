//! Per-frame output of the upstream vision pipeline.

use serde::{Deserialize, Serialize};

use super::Stamp;

/// One trajectory point in camera pixel coordinates.
///
/// `end_flag` is passed through untouched; downstream consumers use it to
/// mark the end of a trajectory segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    pub end_flag: f64,
}

impl PathPoint {
    #[inline]
    pub fn new(x: f64, y: f64, end_flag: f64) -> Self {
        Self { x, y, end_flag }
    }
}

/// Relative motion of the image since the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageOffset {
    /// Rotation in radians
    pub angle: f64,
    /// X displacement in pixels
    pub dx: f64,
    /// Y displacement in pixels
    pub dy: f64,
}

impl ImageOffset {
    #[inline]
    pub fn new(angle: f64, dx: f64, dy: f64) -> Self {
        Self { angle, dx, dy }
    }
}

/// Everything the vision pipeline produces for one camera frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameResult {
    pub angle: f64,
    pub dx: f64,
    pub dy: f64,
    /// Capture time in nanoseconds
    pub timestamp_ns: u64,
    #[serde(default)]
    pub path: Vec<PathPoint>,
}

impl FrameResult {
    pub fn new(offset: ImageOffset, timestamp_ns: u64, path: Vec<PathPoint>) -> Self {
        Self {
            angle: offset.angle,
            dx: offset.dx,
            dy: offset.dy,
            timestamp_ns,
            path,
        }
    }

    #[inline]
    pub fn offset(&self) -> ImageOffset {
        ImageOffset::new(self.angle, self.dx, self.dy)
    }

    #[inline]
    pub fn stamp(&self) -> Stamp {
        Stamp::from_nanos(self.timestamp_ns)
    }
}
