//! Differential drive dead reckoning from wheel encoder increments.
//!
//! Each update takes the tick counts accumulated by the right and left wheel
//! since the previous sample and advances the world pose.
//!
//! # Kinematics
//!
//! ```text
//! θ_wheel  = ticks × 2π / ticks_per_revolution
//! d        = r/2 × (θ_left + θ_right)          forward travel
//! Δx, Δy   = d × (cos ψ, sin ψ)                ψ = heading before the update
//! Δψ       = r/L × (θ_left − θ_right)          TurnSign::Clockwise (default)
//! Δψ       = r/L × (θ_right − θ_left)          TurnSign::CounterClockwise
//! ```
//!
//! The defaults reproduce the recorded vehicle's published odometry: a
//! π-scaled wheel radius and clockwise-positive heading.

use std::f64::consts::{PI, TAU};

use serde::Deserialize;

use crate::core::frames::yaw_to_quaternion;
use crate::core::math::angle_add;
use crate::core::types::{Pose2D, Quaternion};

/// Which way a positive heading change turns the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSign {
    /// Left wheel ahead of the right is positive.
    #[default]
    Clockwise,
    /// Right wheel ahead of the left is positive.
    CounterClockwise,
}

/// Configuration for differential drive odometry.
#[derive(Debug, Clone, Copy)]
pub struct DiffDriveConfig {
    /// Wheel radius in meters.
    pub wheel_radius: f64,

    /// Encoder ticks per full wheel revolution.
    pub ticks_per_revolution: u32,

    /// Distance between the wheel contact points in meters.
    pub axle_length: f64,

    pub turn_sign: TurnSign,
}

impl Default for DiffDriveConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 0.38 * PI,
            ticks_per_revolution: 100,
            axle_length: 1.466,
            turn_sign: TurnSign::Clockwise,
        }
    }
}

impl DiffDriveConfig {
    /// Wheel rotation per encoder tick, in radians.
    #[inline]
    pub fn angle_per_tick(&self) -> f64 {
        TAU / self.ticks_per_revolution.max(1) as f64
    }
}

/// World-frame motion produced by one update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveDelta {
    pub dx: f64,
    pub dy: f64,
    pub dheading: f64,
}

/// Differential drive integrator.
#[derive(Debug)]
pub struct DiffDrive {
    config: DiffDriveConfig,
    pose: Pose2D,
    last_delta: DriveDelta,
}

impl DiffDrive {
    pub fn new(config: DiffDriveConfig) -> Self {
        Self {
            config,
            pose: Pose2D::origin(),
            last_delta: DriveDelta::default(),
        }
    }

    /// Integrate one pair of tick increments and return the new pose.
    pub fn update(&mut self, right_ticks: i64, left_ticks: i64) -> Pose2D {
        let per_tick = self.config.angle_per_tick();
        let theta_right = right_ticks as f64 * per_tick;
        let theta_left = left_ticks as f64 * per_tick;

        let r = self.config.wheel_radius;
        let local = r / 2.0 * (theta_left + theta_right);
        let (sin_h, cos_h) = self.pose.heading.sin_cos();

        let delta = DriveDelta {
            dx: local * cos_h,
            dy: local * sin_h,
            dheading: r / self.config.axle_length * self.wheel_difference(theta_right, theta_left),
        };

        self.pose = Pose2D {
            x: self.pose.x + delta.dx,
            y: self.pose.y + delta.dy,
            heading: angle_add(self.pose.heading, delta.dheading),
        };
        self.last_delta = delta;
        self.pose
    }

    fn wheel_difference(&self, theta_right: f64, theta_left: f64) -> f64 {
        match self.config.turn_sign {
            TurnSign::Clockwise => theta_left - theta_right,
            TurnSign::CounterClockwise => theta_right - theta_left,
        }
    }

    #[inline]
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Motion of the most recent update.
    #[inline]
    pub fn last_delta(&self) -> DriveDelta {
        self.last_delta
    }

    /// Heading as a rotation quaternion about Z.
    #[inline]
    pub fn orientation(&self) -> Quaternion {
        yaw_to_quaternion(self.pose.heading)
    }

    pub fn config(&self) -> &DiffDriveConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.pose = Pose2D::origin();
        self.last_delta = DriveDelta::default();
    }
}
