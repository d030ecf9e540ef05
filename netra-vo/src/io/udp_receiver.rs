//! UDP receiver for vision frames and transforms.
//!
//! The vision pipeline and the localization stack send their output to this
//! node over UDP. Frames are handed to the vision thread through a bounded
//! crossbeam channel; transforms go straight into the shared buffer.
//!
//! # Wire Protocol
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ JSON InboundMessage      │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! # Message Types
//!
//! ```json
//! {"type": "frame", "angle": 0.1, "dx": 100.0, "dy": 50.0, "timestamp_ns": 5000000000, "path": []}
//! {"type": "transform", "stamp": {"secs": 5, "nsecs": 0}, "frame_id": "world_frame", "child_frame_id": "camera_frame", "transform": {...}}
//! {"type": "static_transform", ...}
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::frame_source::{Result, SourceError};
use super::tf::SharedTransformBuffer;
use crate::core::types::{FrameResult, TransformStamped};

/// Channel capacity for frames (small to avoid buffering old data).
pub const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Maximum UDP datagram size.
const MAX_DATAGRAM_SIZE: usize = 65536;

/// Configuration for UDP receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to bind UDP socket (e.g., "0.0.0.0:5600").
    pub bind_addr: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5600".to_string(),
        }
    }
}

/// Messages accepted on the UDP socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Frame(FrameResult),
    Transform(TransformStamped),
    StaticTransform(TransformStamped),
}

/// Decode one length-prefixed datagram.
pub fn decode_datagram(data: &[u8]) -> Result<InboundMessage> {
    if data.len() < 4 {
        return Err(SourceError::Decode(format!(
            "datagram too short: {} bytes",
            data.len()
        )));
    }
    let msg_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if msg_len + 4 > data.len() {
        return Err(SourceError::Decode(format!(
            "message incomplete: expected {} + 4 bytes, got {}",
            msg_len,
            data.len()
        )));
    }
    serde_json::from_slice(&data[4..4 + msg_len]).map_err(|e| SourceError::Decode(e.to_string()))
}

/// Encode a message as a length-prefixed datagram.
pub fn encode_datagram(msg: &InboundMessage) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(msg).map_err(|e| SourceError::Decode(e.to_string()))?;
    let mut datagram = Vec::with_capacity(4 + payload.len());
    datagram.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    datagram.extend_from_slice(&payload);
    Ok(datagram)
}

/// UDP receiver for frames and transforms.
pub struct UdpReceiver {
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    frame_tx: Sender<FrameResult>,
    transforms: SharedTransformBuffer,
}

impl UdpReceiver {
    /// Create a new UDP receiver.
    ///
    /// Returns the receiver and the channel the vision thread reads frames from.
    pub fn new(
        config: ReceiverConfig,
        transforms: SharedTransformBuffer,
        running: Arc<AtomicBool>,
    ) -> Result<(Self, Receiver<FrameResult>)> {
        let socket = UdpSocket::bind(&config.bind_addr)?;

        // Short timeout for shutdown checks
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        let (frame_tx, frame_rx) = bounded(FRAME_CHANNEL_CAPACITY);

        log::info!("UDP receiver bound to {}", config.bind_addr);

        Ok((
            Self {
                socket,
                running,
                frame_tx,
                transforms,
            },
            frame_rx,
        ))
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receiver loop (blocking).
    pub fn run(self) {
        log::info!("UDP receiver started");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut dropped_frames = 0u64;

        while self.running.load(Ordering::Relaxed) {
            let (len, _src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            let msg = match decode_datagram(&buffer[..len]) {
                Ok(msg) => msg,
                Err(e) => {
                    log::warn!("Discarding datagram: {}", e);
                    continue;
                }
            };

            if !self.dispatch(msg, &mut dropped_frames) {
                break;
            }
        }

        log::info!("UDP receiver stopped ({} frames dropped)", dropped_frames);
    }

    /// Route one message. Returns false once the frame consumer is gone.
    fn dispatch(&self, msg: InboundMessage, dropped_frames: &mut u64) -> bool {
        match msg {
            InboundMessage::Frame(frame) => match self.frame_tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    *dropped_frames += 1;
                    log::warn!(
                        "Frame channel full, dropping frame at {} ns",
                        frame.timestamp_ns
                    );
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::info!("Frame consumer disconnected");
                    return false;
                }
            },
            InboundMessage::Transform(tf) => {
                if let Err(e) = self.transforms.write().set_transform(&tf) {
                    log::warn!(
                        "Rejected transform {} -> {}: {}",
                        tf.child_frame_id,
                        tf.frame_id,
                        e
                    );
                }
            }
            InboundMessage::StaticTransform(tf) => {
                if let Err(e) = self.transforms.write().set_static_transform(&tf) {
                    log::warn!(
                        "Rejected static transform {} -> {}: {}",
                        tf.child_frame_id,
                        tf.frame_id,
                        e
                    );
                } else {
                    log::debug!("Static transform {} -> {}", tf.child_frame_id, tf.frame_id);
                }
            }
        }
        true
    }
}
