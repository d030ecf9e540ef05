//! Recorded wheel encoder logs.
//!
//! The recorder writes a single JSON document of four parallel arrays:
//!
//! ```json
//! [["img_0001.png", "img_0002.png"], ["0", "12"], ["3", "4"], ["3", "2"]]
//! ```
//!
//! holding the image filenames, the time of each sample in milliseconds since
//! recording start, and the right (encoder 1) and left (encoder 2) tick
//! increments. Values may be JSON numbers or numeric strings.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::frame_source::{Result, SourceError};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Field {
    Text(String),
    Number(f64),
}

impl Field {
    fn as_int(&self, column: &str, index: usize) -> Result<i64> {
        let invalid = || SourceError::Decode(format!("{}[{}]: {:?} is not an integer", column, index, self));
        match self {
            Field::Text(s) => s.trim().parse().map_err(|_| invalid()),
            Field::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            Field::Number(_) => Err(invalid()),
        }
    }

    fn into_text(self) -> String {
        match self {
            Field::Text(s) => s,
            Field::Number(n) => n.to_string(),
        }
    }
}

/// One encoder sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderRecord {
    pub filename: String,
    /// Milliseconds since the start of the recording
    pub time_ms: i64,
    pub right_ticks: i64,
    pub left_ticks: i64,
}

/// A loaded encoder log.
#[derive(Debug, Clone, Default)]
pub struct EncoderLog {
    records: Vec<EncoderRecord>,
}

impl EncoderLog {
    /// Load a log file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let log = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} encoder records from {}",
            log.len(),
            path.as_ref().display()
        );
        Ok(log)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let columns: (Vec<Field>, Vec<Field>, Vec<Field>, Vec<Field>) =
            serde_json::from_reader(reader).map_err(|e| SourceError::Decode(e.to_string()))?;
        Self::from_columns(columns)
    }

    pub fn parse(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    fn from_columns(
        (filenames, times, right, left): (Vec<Field>, Vec<Field>, Vec<Field>, Vec<Field>),
    ) -> Result<Self> {
        let n = filenames.len();
        if times.len() != n || right.len() != n || left.len() != n {
            return Err(SourceError::Decode(format!(
                "column lengths differ: filenames {}, time {}, encoder1 {}, encoder2 {}",
                n,
                times.len(),
                right.len(),
                left.len()
            )));
        }

        let records = filenames
            .into_iter()
            .enumerate()
            .map(|(i, filename)| {
                Ok(EncoderRecord {
                    filename: filename.into_text(),
                    time_ms: times[i].as_int("time", i)?,
                    right_ticks: right[i].as_int("encoder1", i)?,
                    left_ticks: left[i].as_int("encoder2", i)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn records(&self) -> &[EncoderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncoderRecord> {
        self.records.iter()
    }
}
