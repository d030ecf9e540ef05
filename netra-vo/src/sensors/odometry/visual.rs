//! Visual odometry integration.
//!
//! Accumulates the per-frame image offsets reported by the vision pipeline
//! into a running world pose.
//!
//! Pixel displacements are scaled to meters and added to the position as-is.
//! They are **not** rotated into the current heading: the upstream pipeline
//! already reports displacements in the fixed camera frame.

use crate::core::math::angle_add;
use crate::core::types::{ImageOffset, Pose2D};

/// Meters per pixel of the downward-facing camera.
pub const DEFAULT_PIXEL_SCALE: f64 = 0.0009712;

/// Advance `pose` by one frame of relative motion.
///
/// `dx_px` and `dy_px` are in pixels; `pixel_scale` converts them to meters.
/// The heading wraps into [0, 2π).
///
/// # Example
/// ```
/// use netra_vo::core::types::Pose2D;
/// use netra_vo::sensors::odometry::integrate;
///
/// let pose = integrate(Pose2D::origin(), 0.1, 100.0, 50.0, 0.0009712);
/// assert!((pose.x - 0.09712).abs() < 1e-12);
/// assert!((pose.y - 0.04856).abs() < 1e-12);
/// ```
#[inline]
pub fn integrate(pose: Pose2D, delta_angle: f64, dx_px: f64, dy_px: f64, pixel_scale: f64) -> Pose2D {
    Pose2D {
        x: pose.x + dx_px * pixel_scale,
        y: pose.y + dy_px * pixel_scale,
        heading: angle_add(pose.heading, delta_angle),
    }
}

/// Running visual odometry state.
#[derive(Debug, Clone)]
pub struct VisualOdometry {
    pose: Pose2D,
    pixel_scale: f64,
}

impl VisualOdometry {
    /// Start at the origin with the given meters-per-pixel scale.
    pub fn new(pixel_scale: f64) -> Self {
        Self {
            pose: Pose2D::origin(),
            pixel_scale,
        }
    }

    /// Integrate one frame's offset and return the new pose.
    pub fn update(&mut self, offset: &ImageOffset) -> Pose2D {
        self.pose = integrate(self.pose, offset.angle, offset.dx, offset.dy, self.pixel_scale);
        self.pose
    }

    /// Current world pose.
    #[inline]
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    #[inline]
    pub fn pixel_scale(&self) -> f64 {
        self.pixel_scale
    }

    /// Back to the origin.
    pub fn reset(&mut self) {
        self.pose = Pose2D::origin();
    }
}

impl Default for VisualOdometry {
    fn default() -> Self {
        Self::new(DEFAULT_PIXEL_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::angle_diff;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    #[test]
    fn test_first_frame() {
        let mut vo = VisualOdometry::default();
        let pose = vo.update(&ImageOffset::new(0.1, 100.0, 50.0));

        assert_relative_eq!(pose.x, 0.09712, epsilon = 1e-12);
        assert_relative_eq!(pose.y, 0.04856, epsilon = 1e-12);
        assert_relative_eq!(pose.heading, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_offset_leaves_pose_unchanged() {
        let mut vo = VisualOdometry::default();
        vo.update(&ImageOffset::new(1.0, 10.0, -10.0));
        let before = vo.pose();
        let after = vo.update(&ImageOffset::default());
        assert_eq!(before, after);
    }

    #[test]
    fn test_heading_wraps_both_ways() {
        let pose = integrate(Pose2D::new(0.0, 0.0, 6.0), 0.5, 0.0, 0.0, 1.0);
        assert_relative_eq!(pose.heading, 6.5 - TAU, epsilon = 1e-12);

        let pose = integrate(Pose2D::new(0.0, 0.0, 0.1), -0.2, 0.0, 0.0, 1.0);
        assert_relative_eq!(pose.heading, TAU - 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_displacement_ignores_heading() {
        let pose = integrate(Pose2D::new(0.0, 0.0, 1.2), 0.0, 10.0, 0.0, 0.5);
        assert_relative_eq!(pose.x, 5.0);
        assert_relative_eq!(pose.y, 0.0);
    }

    #[test]
    fn test_two_steps_match_summed_deltas() {
        let scale = DEFAULT_PIXEL_SCALE;
        let a = ImageOffset::new(4.0, 12.0, -7.0);
        let b = ImageOffset::new(3.5, -2.0, 30.0);

        let mut vo = VisualOdometry::new(scale);
        vo.update(&a);
        let stepwise = vo.update(&b);

        let summed = integrate(Pose2D::origin(), a.angle + b.angle, a.dx + b.dx, a.dy + b.dy, scale);

        assert_relative_eq!(stepwise.x, summed.x, epsilon = 1e-12);
        assert_relative_eq!(stepwise.y, summed.y, epsilon = 1e-12);
        assert!(angle_diff(stepwise.heading, summed.heading).abs() < 1e-9);
    }

    #[test]
    fn test_heading_stays_in_range() {
        let mut vo = VisualOdometry::default();
        for i in 0..500 {
            let angle = if i % 3 == 0 { -2.7 } else { 1.9 };
            let pose = vo.update(&ImageOffset::new(angle, 1.0, 1.0));
            assert!((0.0..TAU).contains(&pose.heading), "heading {}", pose.heading);
        }
    }

    #[test]
    fn test_reset() {
        let mut vo = VisualOdometry::default();
        vo.update(&ImageOffset::new(0.3, 5.0, 5.0));
        vo.reset();
        assert_eq!(vo.pose(), Pose2D::origin());
    }
}
