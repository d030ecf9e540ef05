//! NetraVO - Visual odometry publisher for camera-guided robots
//!
//! Consumes per-frame image motion estimates from an upstream vision
//! pipeline, dead-reckons a world pose, and streams:
//! - **Odometry**: pose, orientation and per-frame motion of the vehicle base
//! - **Points**: the frame's trajectory points mapped into the world frame
//!
//! A second binary, `encoder-odom`, replays recorded wheel encoder logs
//! through a differential drive model and publishes the same odometry record.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  bin/ + threads/                    │  ← Executables
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │            (vision node, encoder node)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │   (frame sources, udp, tf buffer, tcp streaming)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │          (visual and wheel odometry)                │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │          (types, angle math, rigid frames)          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Frames
//!
//! Visual odometry is integrated in camera pixels, scaled to meters and
//! expressed in the vehicle base through the fixed camera mounting
//! transform. Trajectory points are mapped with the world←camera transform
//! looked up at the frame's capture time.

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Sensor processing (depends on core)
pub mod sensors;

// Layer 3: I/O infrastructure (depends on core)
pub mod io;

// Layer 4: Node orchestration (depends on all of the above)
pub mod engine;

// Layer 5: Thread infrastructure
pub mod threads;

pub mod config;
pub mod error;
pub mod utils;

pub use config::Config;
pub use crate::core::frames::{GeometryError, transform_point};
pub use crate::core::math::angle_add;
pub use crate::core::types::{FrameResult, Pose2D, RigidTransform, Stamp};
pub use engine::{EncoderNode, EncoderNodeConfig, FrameOutcome, VisionNode, VisionNodeConfig, VisionOutputs};
pub use error::{Error, Result};
pub use sensors::odometry::VisualOdometry;
