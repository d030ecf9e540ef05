//! Core types and pure geometry.
//!
//! Nothing in here does I/O or holds shared state.

pub mod frames;
pub mod math;
pub mod types;

pub use frames::{GeometryError, transform_point};
pub use types::*;
