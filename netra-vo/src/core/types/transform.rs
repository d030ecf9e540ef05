//! Rigid transform types, laid out like the message fields they are
//! exchanged as (quaternion in x, y, z, w order).

use serde::{Deserialize, Serialize};

use super::Stamp;

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Rotation quaternion, `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation `(0, 0, 0, 1)`.
    #[inline]
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Rotation about Z by `yaw` radians (roll = pitch = 0).
    #[inline]
    pub fn from_yaw(yaw: f64) -> Self {
        let (s, c) = (yaw * 0.5).sin_cos();
        Self::new(0.0, 0.0, s, c)
    }

    /// Euclidean norm.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation followed by translation, mapping points from a child frame into
/// its parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidTransform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl RigidTransform {
    #[inline]
    pub fn new(translation: Vector3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Zero translation, identity rotation.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Pure translation.
    #[inline]
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), Quaternion::identity())
    }

    /// Planar transform: translation (x, y) and rotation `yaw` about Z.
    #[inline]
    pub fn planar(x: f64, y: f64, yaw: f64) -> Self {
        Self::new(Vector3::new(x, y, 0.0), Quaternion::from_yaw(yaw))
    }
}

/// A transform between two named frames at a point in time.
///
/// `frame_id` is the parent; `child_frame_id` the frame whose points the
/// transform maps into the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    pub stamp: Stamp,
    pub frame_id: String,
    pub child_frame_id: String,
    pub transform: RigidTransform,
}

impl TransformStamped {
    pub fn new(
        stamp: Stamp,
        frame_id: impl Into<String>,
        child_frame_id: impl Into<String>,
        transform: RigidTransform,
    ) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
            child_frame_id: child_frame_id.into(),
            transform,
        }
    }
}
