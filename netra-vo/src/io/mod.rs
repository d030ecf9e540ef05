//! I/O: inputs, transforms, and published outputs.
//!
//! - [`frame_source`]: where vision frames come from
//! - [`udp_receiver`]: frames and transforms over UDP
//! - [`tf`]: transform buffer and the lookup contract
//! - [`encoder_log`]: recorded wheel encoder increments
//! - [`messages`]: published record types
//! - [`streaming`]: publishers and the TCP stream server

pub mod encoder_log;
pub mod frame_source;
pub mod messages;
pub mod streaming;
pub mod tf;
pub mod udp_receiver;

pub use encoder_log::{EncoderLog, EncoderRecord};
pub use frame_source::{ChannelFrameSource, FrameSource, FrameStatus, ReplayFrameSource, SourceError};
pub use streaming::{Publisher, PublisherError, RecordingPublisher, StreamServer, TopicPublisher};
pub use tf::{LookupError, SharedTransformBuffer, TransformBuffer, TransformProvider};
pub use udp_receiver::{InboundMessage, ReceiverConfig, UdpReceiver};
