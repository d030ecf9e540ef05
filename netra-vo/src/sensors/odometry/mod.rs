//! Dead-reckoning odometry.
//!
//! # Components
//!
//! - [`VisualOdometry`]: Accumulate image offsets from the vision pipeline into a world pose
//! - [`DiffDrive`]: Integrate wheel encoder increments with differential drive kinematics
//!
//! Neither component filters or corrects; the pose is only ever accumulated.
//!
//! # Example
//!
//! ```
//! use netra_vo::core::types::ImageOffset;
//! use netra_vo::sensors::odometry::{DiffDrive, DiffDriveConfig, VisualOdometry};
//!
//! let mut vo = VisualOdometry::new(0.0009712);
//! let pose = vo.update(&ImageOffset::new(0.1, 100.0, 50.0));
//! assert!(pose.heading > 0.0);
//!
//! let mut wheels = DiffDrive::new(DiffDriveConfig::default());
//! let pose = wheels.update(10, 10);
//! assert!(pose.x > 0.0);
//! ```

mod diff_drive;
mod visual;

pub use diff_drive::{DiffDrive, DiffDriveConfig, DriveDelta, TurnSign};
pub use visual::{DEFAULT_PIXEL_SCALE, VisualOdometry, integrate};
