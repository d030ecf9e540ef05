//! Node orchestration.
//!
//! - [`vision_node`]: vision frames → odometry and world-frame trajectory points
//! - [`encoder_node`]: recorded wheel encoder increments → odometry

pub mod encoder_node;
pub mod vision_node;

pub use encoder_node::{EncoderNode, EncoderNodeConfig};
pub use vision_node::{FrameOutcome, NodeState, NodeStats, VisionNode, VisionNodeConfig, VisionOutputs};
