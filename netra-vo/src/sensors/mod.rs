//! Sensor processing.

pub mod odometry;
