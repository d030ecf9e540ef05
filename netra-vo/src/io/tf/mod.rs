//! Coordinate frame transforms over time.
//!
//! The vision node only needs to ask two questions of the outside world:
//! *is there a path between these frames yet?* and *what is the transform
//! between them at this time?* [`TransformProvider`] captures exactly that.
//!
//! [`TransformBuffer`] is the in-process implementation, fed by the UDP
//! receiver and shared with the vision thread as a [`SharedTransformBuffer`].
//!
//! # Conventions
//!
//! `lookup_transform(target, source, stamp)` returns the transform that maps
//! points expressed in `source` into `target`. A zero [`Stamp`] asks for the
//! latest data on every edge.

mod buffer;
mod chain;

use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

use crate::core::types::{RigidTransform, Stamp};

pub use buffer::{DEFAULT_CACHE_DURATION, TransformBuffer};

/// Transform lookup errors. All of them are transient from the caller's
/// point of view: more data may make the next attempt succeed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Extrapolation error: {0}")]
    Extrapolation(String),
}

/// Source of transforms between named frames.
pub trait TransformProvider {
    /// True when a chain between the frames exists and every edge has data.
    fn can_transform(&self, target: &str, source: &str) -> bool;

    /// Transform mapping `source` points into `target` at `stamp`.
    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        stamp: Stamp,
    ) -> Result<RigidTransform, LookupError>;
}

/// Transform buffer shared between the receiver (writer) and the vision
/// thread (reader).
pub type SharedTransformBuffer = Arc<RwLock<TransformBuffer>>;

/// Wrap a buffer for sharing between threads.
pub fn create_shared_buffer(buffer: TransformBuffer) -> SharedTransformBuffer {
    Arc::new(RwLock::new(buffer))
}

impl TransformProvider for SharedTransformBuffer {
    fn can_transform(&self, target: &str, source: &str) -> bool {
        self.read().can_transform(target, source)
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        stamp: Stamp,
    ) -> Result<RigidTransform, LookupError> {
        self.read().lookup_transform(target, source, stamp)
    }
}

impl<P: TransformProvider + ?Sized> TransformProvider for &P {
    fn can_transform(&self, target: &str, source: &str) -> bool {
        (**self).can_transform(target, source)
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        stamp: Stamp,
    ) -> Result<RigidTransform, LookupError> {
        (**self).lookup_transform(target, source, stamp)
    }
}
