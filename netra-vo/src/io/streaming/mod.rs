//! Output streaming.
//!
//! Records leave the node through the [`Publisher`] trait:
//!
//! - [`TopicPublisher`]: queue frames for the [`StreamServer`], which
//!   broadcasts them to every connected TCP client
//! - [`RecordingPublisher`]: keep messages in memory for tests and tools
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────────┬────────────────┬──────┬────────────────┐
//! │ Length (4 bytes) │ Topic (UTF-8)  │ 0x00 │ JSON payload   │
//! │ Big-endian u32   │                │      │                │
//! └──────────────────┴────────────────┴──────┴────────────────┘
//! ```
//!
//! The length covers topic, terminator and payload.

mod recording;
mod tcp_server;

use thiserror::Error;

pub use recording::RecordingPublisher;
pub use tcp_server::{StreamHandle, StreamServer, TopicPublisher};

/// Publisher errors
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Queue full on topic {0}")]
    QueueFull(String),

    #[error("Stream server disconnected")]
    Disconnected,
}

impl From<serde_json::Error> for PublisherError {
    fn from(e: serde_json::Error) -> Self {
        PublisherError::Encode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PublisherError>;

/// Sink for outgoing messages of type `M`.
pub trait Publisher<M> {
    fn publish(&mut self, msg: &M) -> Result<()>;
}

impl<M, P: Publisher<M> + ?Sized> Publisher<M> for Box<P> {
    fn publish(&mut self, msg: &M) -> Result<()> {
        (**self).publish(msg)
    }
}

/// Build one wire frame for `topic` into `buffer`.
pub fn encode_frame<T: serde::Serialize>(topic: &str, message: &T, buffer: &mut Vec<u8>) -> Result<()> {
    let payload = serde_json::to_vec(message)?;

    buffer.clear();
    buffer.reserve(4 + topic.len() + 1 + payload.len());

    let frame_length = (topic.len() + 1 + payload.len()) as u32;
    buffer.extend_from_slice(&frame_length.to_be_bytes());
    buffer.extend_from_slice(topic.as_bytes());
    buffer.push(0);
    buffer.extend_from_slice(&payload);
    Ok(())
}

/// Split a frame body (without the length prefix) into topic and payload.
pub fn decode_frame(body: &[u8]) -> Option<(&str, &[u8])> {
    let nul = body.iter().position(|&b| b == 0)?;
    let topic = std::str::from_utf8(&body[..nul]).ok()?;
    Some((topic, &body[nul + 1..]))
}
