//! Covariance matrices attached to published pose and twist records.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 6x6 covariance over (x, y, z, roll, pitch, yaw).
///
/// Stored as a row-major 36-element array, the layout message consumers expect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariance6 {
    data: [f64; 36],
}

impl Covariance6 {
    /// Zero covariance.
    #[inline]
    pub fn zero() -> Self {
        Self { data: [0.0; 36] }
    }

    /// Same variance on every diagonal entry.
    #[inline]
    pub fn diagonal(variance: f64) -> Self {
        let mut data = [0.0; 36];
        for i in 0..6 {
            data[i * 7] = variance;
        }
        Self { data }
    }

    /// Create from row-major array.
    #[inline]
    pub fn from_array(data: [f64; 36]) -> Self {
        Self { data }
    }

    /// Element at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * 6 + col]
    }

    /// Get raw data as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64; 36] {
        &self.data
    }
}

impl Default for Covariance6 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Serialize for Covariance6 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.data.iter())
    }
}

impl<'de> Deserialize<'de> for Covariance6 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        let len = values.len();
        let data: [f64; 36] = values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"36 covariance elements"))?;
        Ok(Self { data })
    }
}
