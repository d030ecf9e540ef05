//! Message timestamps.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Timestamp split into whole seconds and nanoseconds, as carried in
/// message headers.
///
/// A zero stamp asks a transform lookup for the latest available data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Stamp {
    pub secs: u32,
    pub nsecs: u32,
}

impl Stamp {
    /// The zero stamp ("latest" for lookups).
    pub const ZERO: Stamp = Stamp { secs: 0, nsecs: 0 };

    /// Create a stamp from its parts.
    #[inline]
    pub fn new(secs: u32, nsecs: u32) -> Self {
        Self { secs, nsecs }
    }

    /// Split an integer nanosecond timestamp.
    ///
    /// Seconds saturate at `u32::MAX`.
    #[inline]
    pub fn from_nanos(nanos: u64) -> Self {
        let nsecs = nanos % NANOS_PER_SEC;
        let secs = (nanos - nsecs) / NANOS_PER_SEC;
        Self {
            secs: u32::try_from(secs).unwrap_or(u32::MAX),
            nsecs: nsecs as u32,
        }
    }

    /// Total nanoseconds.
    #[inline]
    pub fn as_nanos(&self) -> u64 {
        self.secs as u64 * NANOS_PER_SEC + self.nsecs as u64
    }

    /// Seconds as floating point.
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.nsecs as f64 * 1e-9
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.nsecs == 0
    }

    /// Wall-clock time now.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_nanos(since_epoch.as_nanos() as u64)
    }
}
