//! Mathematical primitives for planar odometry.
//!
//! Headings in this crate live in [0, 2π) rather than [-π, π], because the
//! published orientation is accumulated by wraparound addition.

use std::f64::consts::{PI, TAU};

/// Add two angles and wrap the result into [0, 2π).
///
/// Works for any finite inputs, including negative increments.
///
/// # Example
/// ```
/// use netra_vo::core::math::angle_add;
/// use std::f64::consts::TAU;
///
/// assert!((angle_add(6.0, 0.5) - (6.5 - TAU)).abs() < 1e-12);
/// assert!((angle_add(0.1, -0.2) - (TAU - 0.1)).abs() < 1e-12);
/// ```
#[inline]
pub fn angle_add(a: f64, b: f64) -> f64 {
    let sum = (a + b).rem_euclid(TAU);
    // rem_euclid rounds tiny negative sums up to exactly TAU
    if sum >= TAU { 0.0 } else { sum }
}

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Shortest signed angular distance from `a` to `b`.
#[inline]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(b - a)
}
