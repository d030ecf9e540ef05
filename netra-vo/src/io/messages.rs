//! Published message types.
//!
//! Field names and nesting follow the robotics message layouts downstream
//! consumers already parse (`nav_msgs/Odometry`, `geometry_msgs/PointStamped`),
//! serialized as JSON on the stream.

use serde::{Deserialize, Serialize};

use crate::core::types::{Covariance6, Quaternion, Stamp, Vector3};

/// Message header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    /// Per-publisher sequence number
    pub seq: u32,
    pub stamp: Stamp,
    pub frame_id: String,
}

impl Header {
    pub fn new(seq: u32, stamp: Stamp, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseWithCovariance {
    pub pose: Pose,
    pub covariance: Covariance6,
}

/// Linear and angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TwistWithCovariance {
    pub twist: Twist,
    pub covariance: Covariance6,
}

/// Odometry record: pose in `header.frame_id`, twist in `child_frame_id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: PoseWithCovariance,
    pub twist: TwistWithCovariance,
}

/// A point with a header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointStamped {
    pub header: Header,
    pub point: Point,
}
