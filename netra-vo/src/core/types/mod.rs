//! Core data types.
//!
//! - [`Point2D`], [`Pose2D`]: planar position and world pose
//! - [`Stamp`]: seconds/nanoseconds message timestamp
//! - [`Vector3`], [`Quaternion`], [`RigidTransform`], [`TransformStamped`]: frame transforms
//! - [`FrameResult`], [`PathPoint`], [`ImageOffset`]: per-frame vision output
//! - [`Covariance6`]: 6x6 covariance attached to published records

mod covariance;
mod frame;
mod pose;
mod stamp;
mod transform;

pub use covariance::Covariance6;
pub use frame::{FrameResult, ImageOffset, PathPoint};
pub use pose::{Point2D, Pose2D};
pub use stamp::Stamp;
pub use transform::{Quaternion, RigidTransform, TransformStamped, Vector3};
