//! Pose and point types for planar odometry.

use serde::{Deserialize, Serialize};

use crate::core::math::{angle_add, angle_diff};

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f64,
    /// Y coordinate in meters
    pub y: f64,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// World pose of the vehicle in the plane.
///
/// Position (x, y) in meters and heading in radians, kept in [0, 2π).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Heading in radians, normalized to [0, 2π)
    pub heading: f64,
}

impl Pose2D {
    /// Create a new pose with heading wrapped into [0, 2π).
    #[inline]
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: angle_add(heading, 0.0),
        }
    }

    /// Pose at the origin with zero heading.
    #[inline]
    pub fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
        }
    }

    /// Position part of the pose.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Whether two poses agree within `tolerance`, comparing headings on the circle.
    pub fn approx_eq(&self, other: &Pose2D, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && angle_diff(self.heading, other.heading).abs() <= tolerance
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::origin()
    }
}
