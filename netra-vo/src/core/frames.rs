//! Rigid-body frame transforms.
//!
//! Points are moved between frames with a 4x4 homogeneous matrix built from
//! a unit quaternion and a translation. Motion is planar, so only x and y of
//! the transformed point are returned.
//!
//! ```text
//! ┌          ┐   ┌       ┐ ┌   ┐
//! │ x'       │   │ R   t │ │ x │
//! │ y'       │ = │       │ │ y │
//! │ (z')     │   │       │ │ 0 │
//! │ (1)      │   │ 0   1 │ │ 1 │
//! └          ┘   └       ┘ └   ┘
//! ```

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector4};
use thiserror::Error;

use crate::core::types::{Quaternion, RigidTransform, Vector3};

/// Allowed deviation of a rotation quaternion's norm from 1.
pub const QUATERNION_NORM_TOLERANCE: f64 = 1e-6;

/// Geometry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid transform argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

impl RigidTransform {
    /// Check that this is a well-formed rigid transform: finite translation
    /// and a finite unit rotation quaternion.
    pub fn validate(&self) -> Result<()> {
        if !self.translation.is_finite() {
            return Err(GeometryError::InvalidArgument(format!(
                "translation is not finite: {:?}",
                self.translation
            )));
        }
        if !self.rotation.is_finite() {
            return Err(GeometryError::InvalidArgument(format!(
                "rotation is not finite: {:?}",
                self.rotation
            )));
        }
        let norm = self.rotation.norm();
        if (norm - 1.0).abs() > QUATERNION_NORM_TOLERANCE {
            return Err(GeometryError::InvalidArgument(format!(
                "rotation is not a unit quaternion (norm {:.9})",
                norm
            )));
        }
        Ok(())
    }

    /// Convert to a nalgebra isometry, validating first.
    pub fn to_isometry(&self) -> Result<Isometry3<f64>> {
        self.validate()?;
        let q = &self.rotation;
        let rotation =
            UnitQuaternion::new_normalize(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z));
        let t = &self.translation;
        Ok(Isometry3::from_parts(
            Translation3::new(t.x, t.y, t.z),
            rotation,
        ))
    }

    /// Build from a nalgebra isometry.
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        let t = &iso.translation.vector;
        let q = iso.rotation.quaternion();
        RigidTransform::new(
            Vector3::new(t.x, t.y, t.z),
            Quaternion::new(q.i, q.j, q.k, q.w),
        )
    }

    /// 4x4 homogeneous matrix: rotation block from the quaternion, translation
    /// in the last column.
    pub fn to_matrix(&self) -> Result<Matrix4<f64>> {
        Ok(self.to_isometry()?.to_homogeneous())
    }

    /// The transform mapping points back from the parent into the child frame.
    pub fn inverse(&self) -> Result<RigidTransform> {
        Ok(Self::from_isometry(&self.to_isometry()?.inverse()))
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &RigidTransform) -> Result<RigidTransform> {
        Ok(Self::from_isometry(&(self.to_isometry()? * other.to_isometry()?)))
    }

    /// Interpolate towards `other` (`t` = 0 gives `self`, `t` = 1 gives `other`).
    ///
    /// Translation is interpolated linearly, rotation by slerp.
    pub fn interpolate(&self, other: &RigidTransform, t: f64) -> Result<RigidTransform> {
        let a = self.to_isometry()?;
        let b = other.to_isometry()?;

        let translation = a.translation.vector.lerp(&b.translation.vector, t);
        // Antipodal rotations have no unique slerp path; take the nearer endpoint
        let rotation = a
            .rotation
            .try_slerp(&b.rotation, t, 1e-9)
            .unwrap_or(if t < 0.5 { a.rotation } else { b.rotation });

        Ok(Self::from_isometry(&Isometry3::from_parts(
            Translation3::from(translation),
            rotation,
        )))
    }

    /// Transform a planar point; see [`transform_point`].
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        transform_point(x, y, self)
    }
}

/// Transform the point `(x, y, 0)` by `transform` and return the new x, y.
///
/// Fails with [`GeometryError::InvalidArgument`] when the transform does not
/// carry a finite unit rotation quaternion and a finite translation.
///
/// # Example
/// ```
/// use netra_vo::core::frames::transform_point;
/// use netra_vo::core::types::RigidTransform;
///
/// let (x, y) = transform_point(3.0, 4.0, &RigidTransform::identity()).unwrap();
/// assert_eq!((x, y), (3.0, 4.0));
/// ```
pub fn transform_point(x: f64, y: f64, transform: &RigidTransform) -> Result<(f64, f64)> {
    let matrix = transform.to_matrix()?;
    let result = matrix * Vector4::new(x, y, 0.0, 1.0);
    Ok((result.x, result.y))
}

/// Quaternion for a rotation of `yaw` radians about Z (roll = pitch = 0).
#[inline]
pub fn yaw_to_quaternion(yaw: f64) -> Quaternion {
    Quaternion::from_yaw(yaw)
}

/// Yaw angle of a rotation quaternion, in [-π, π].
#[inline]
pub fn quaternion_to_yaw(q: &Quaternion) -> f64 {
    let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
    let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
    siny_cosp.atan2(cosy_cosp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_yaw_quaternion_round_trip() {
        for yaw in [0.0, 0.1, -1.2, 2.9] {
            assert_relative_eq!(quaternion_to_yaw(&yaw_to_quaternion(yaw)), yaw, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_identity_is_noop() {
        let (x, y) = transform_point(3.0, 4.0, &RigidTransform::identity()).unwrap();
        assert_relative_eq!(x, 3.0);
        assert_relative_eq!(y, 4.0);
    }

    #[test]
    fn test_pure_translation() {
        let t = RigidTransform::from_translation(-0.067, 0.42665, 0.0);
        let (x, y) = transform_point(1.0, 2.0, &t).unwrap();
        assert_relative_eq!(x, 0.933, epsilon = 1e-12);
        assert_relative_eq!(y, 2.42665, epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_turn() {
        let t = RigidTransform::planar(1.0, 0.0, FRAC_PI_2);
        let (x, y) = transform_point(1.0, 0.0, &t).unwrap();
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ignores_out_of_plane_translation() {
        let t = RigidTransform::from_translation(0.5, 0.5, 3.0);
        let (x, y) = transform_point(1.0, 1.0, &t).unwrap();
        assert_relative_eq!(x, 1.5);
        assert_relative_eq!(y, 1.5);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = RigidTransform::planar(2.0, -1.5, 0.7);
        let inv = t.inverse().unwrap();
        let (x, y) = transform_point(0.3, -4.2, &t).unwrap();
        let (bx, by) = transform_point(x, y, &inv).unwrap();
        assert_relative_eq!(bx, 0.3, epsilon = 1e-9);
        assert_relative_eq!(by, -4.2, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_round_trip_tilted() {
        // Tilted about X: only the full 3D inverse undoes it
        let s = (0.25f64).sin();
        let c = (0.25f64).cos();
        let t = RigidTransform::new(Vector3::new(1.0, 2.0, 3.0), Quaternion::new(s, 0.0, 0.0, c));
        let composed = t.compose(&t.inverse().unwrap()).unwrap();
        let (x, y) = transform_point(5.0, -2.0, &composed).unwrap();
        assert_relative_eq!(x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(y, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_compose_order() {
        let move_forward = RigidTransform::planar(1.0, 0.0, 0.0);
        let rotate = RigidTransform::planar(0.0, 0.0, FRAC_PI_2);

        let (x, y) = move_forward.compose(&rotate).unwrap().apply(1.0, 0.0).unwrap();
        assert_relative_eq!(x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(y, 1.0, epsilon = 1e-12);

        let (x, y) = rotate.compose(&move_forward).unwrap().apply(1.0, 0.0).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_layout() {
        let m = RigidTransform::from_translation(1.0, 2.0, 3.0).to_matrix().unwrap();
        assert_eq!(m[(0, 3)], 1.0);
        assert_eq!(m[(1, 3)], 2.0);
        assert_eq!(m[(2, 3)], 3.0);
        assert_eq!(m[(3, 3)], 1.0);
        assert_eq!(m[(0, 0)], 1.0);
    }

    #[test]
    fn test_rejects_non_unit_rotation() {
        let t = RigidTransform::new(Vector3::zero(), Quaternion::new(0.0, 0.0, 0.0, 2.0));
        assert!(matches!(
            transform_point(1.0, 1.0, &t),
            Err(GeometryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_zero_rotation() {
        let t = RigidTransform::new(Vector3::zero(), Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_rejects_nan() {
        let t = RigidTransform::new(Vector3::new(f64::NAN, 0.0, 0.0), Quaternion::identity());
        assert!(transform_point(0.0, 0.0, &t).is_err());

        let t = RigidTransform::new(Vector3::zero(), Quaternion::new(f64::NAN, 0.0, 0.0, 1.0));
        assert!(transform_point(0.0, 0.0, &t).is_err());
    }

    #[test]
    fn test_accepts_slightly_denormalized_rotation() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 1.0 + 1e-9);
        let t = RigidTransform::new(Vector3::zero(), q);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = RigidTransform::planar(0.0, 0.0, 0.0);
        let b = RigidTransform::planar(2.0, 4.0, FRAC_PI_2);
        let mid = a.interpolate(&b, 0.5).unwrap();
        assert_relative_eq!(mid.translation.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(mid.translation.y, 2.0, epsilon = 1e-12);
        let expected = Quaternion::from_yaw(FRAC_PI_2 / 2.0);
        assert_relative_eq!(mid.rotation.z, expected.z, epsilon = 1e-9);
        assert_relative_eq!(mid.rotation.w, expected.w, epsilon = 1e-9);
    }
}
