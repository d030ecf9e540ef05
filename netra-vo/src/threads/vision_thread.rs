//! Vision Thread - runs the vision node over a frame source.
//!
//! This thread:
//! - Owns the node, and with it the only copy of the world pose
//! - Waits for frames with a bounded poll so shutdown is noticed
//! - Clears the shared running flag when it exits, so the other threads
//!   follow it down

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::vision_node::{NodeStats, VisionNode};
use crate::error::Result;
use crate::io::frame_source::FrameSource;
use crate::io::tf::TransformProvider;

/// Vision thread handle.
pub struct VisionThread {
    handle: JoinHandle<Result<NodeStats>>,
}

impl VisionThread {
    /// Spawn the vision thread.
    ///
    /// - `node`: configured vision node
    /// - `source`: where frames come from
    /// - `poll_timeout`: longest single wait for a frame
    /// - `running`: shared shutdown flag
    pub fn spawn<P, S>(
        mut node: VisionNode<P>,
        mut source: S,
        poll_timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Self
    where
        P: TransformProvider + Send + 'static,
        S: FrameSource + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("vision".into())
            .spawn(move || {
                log::info!("Vision thread starting");
                let result = node.run(&mut source, poll_timeout);
                if let Err(ref e) = result {
                    log::error!("Vision node failed: {}", e);
                }
                running.store(false, Ordering::SeqCst);
                result
            })
            .expect("Failed to spawn vision thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<Result<NodeStats>> {
        self.handle.join()
    }
}
