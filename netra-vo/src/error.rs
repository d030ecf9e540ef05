//! Error types for netra-vo

use crate::config::ConfigError;
use crate::core::frames::GeometryError;
use crate::io::frame_source::SourceError;
use crate::io::streaming::PublisherError;
use crate::io::tf::LookupError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// netra-vo error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed transform
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Frame or log input failure
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Output failure
    #[error("Publisher error: {0}")]
    Publisher(#[from] PublisherError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured limit of back-to-back lookup failures was reached
    #[error("Transform lookup failed {failures} consecutive times, last error: {last}")]
    LookupRetriesExhausted {
        failures: u32,
        last: LookupError,
    },
}
