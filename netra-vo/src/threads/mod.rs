//! Thread management for the vision daemon.
//!
//! - `VisionThread`: frame processing and publishing
//!
//! The UDP receiver and the TCP stream server run on their own threads,
//! spawned by their owners in `io`.

mod vision_thread;

pub use vision_thread::VisionThread;
