//! Sources of vision pipeline frames.
//!
//! A [`FrameSource`] hands the vision loop one [`FrameResult`] at a time.
//! After [`FrameSource::wait_for_frame`] returns [`FrameStatus::Ready`], the
//! accessor methods describe that frame until the next wait.
//!
//! - [`ChannelFrameSource`]: frames pushed by another thread (UDP receiver)
//! - [`ReplayFrameSource`]: JSON-lines recording, one `FrameResult` per line

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::types::{FrameResult, ImageOffset, PathPoint};

/// Frame source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Result of waiting for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A new frame is available through the accessors.
    Ready,
    /// Nothing arrived within the timeout; try again.
    Pending,
    /// The source will never produce another frame.
    Finished,
}

/// Provider of vision pipeline results.
pub trait FrameSource {
    /// Block for up to `timeout` waiting for the next frame.
    fn wait_for_frame(&mut self, timeout: Duration) -> Result<FrameStatus>;

    /// Trajectory points of the current frame.
    fn get_data(&self) -> &[PathPoint];

    /// Capture time of the current frame, in nanoseconds.
    fn get_frame_time(&self) -> u64;

    /// Image offset of the current frame.
    fn get_image_offset(&self) -> ImageOffset;

    /// The current frame as one value.
    fn snapshot(&self) -> FrameResult {
        FrameResult::new(
            self.get_image_offset(),
            self.get_frame_time(),
            self.get_data().to_vec(),
        )
    }
}

// ============================================================================
// Channel source
// ============================================================================

/// Frames delivered over a crossbeam channel.
pub struct ChannelFrameSource {
    rx: Receiver<FrameResult>,
    current: FrameResult,
}

impl ChannelFrameSource {
    pub fn new(rx: Receiver<FrameResult>) -> Self {
        Self {
            rx,
            current: FrameResult::default(),
        }
    }
}

impl FrameSource for ChannelFrameSource {
    fn wait_for_frame(&mut self, timeout: Duration) -> Result<FrameStatus> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => {
                self.current = frame;
                Ok(FrameStatus::Ready)
            }
            Err(RecvTimeoutError::Timeout) => Ok(FrameStatus::Pending),
            Err(RecvTimeoutError::Disconnected) => Ok(FrameStatus::Finished),
        }
    }

    fn get_data(&self) -> &[PathPoint] {
        &self.current.path
    }

    fn get_frame_time(&self) -> u64 {
        self.current.timestamp_ns
    }

    fn get_image_offset(&self) -> ImageOffset {
        self.current.offset()
    }

    fn snapshot(&self) -> FrameResult {
        self.current.clone()
    }
}

// ============================================================================
// Replay source
// ============================================================================

/// Frames read from a JSON-lines recording.
///
/// Blank lines are skipped. A line that does not parse ends the replay with
/// [`SourceError::Decode`].
///
/// With pacing enabled, each frame is released when its recorded timestamp
/// (relative to the first frame, divided by the speed factor) has elapsed.
pub struct ReplayFrameSource<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
    speed: Option<f64>,
    clock: Option<(Instant, u64)>,
    pending: Option<FrameResult>,
    current: FrameResult,
}

impl ReplayFrameSource<BufReader<File>> {
    /// Open a recording file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::info!("Replaying frames from {}", path.as_ref().display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayFrameSource<R> {
    /// Replay from any buffered reader, as fast as frames are requested.
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            speed: None,
            clock: None,
            pending: None,
            current: FrameResult::default(),
        }
    }

    /// Release frames at `speed` times their recorded rate. Non-positive
    /// speeds disable pacing.
    pub fn with_pacing(mut self, speed: f64) -> Self {
        self.speed = (speed > 0.0).then_some(speed);
        self
    }

    fn next_frame(&mut self) -> Result<Option<FrameResult>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str(&line)
                .map_err(|e| SourceError::Decode(format!("line {}: {}", self.line_no, e)))?;
            return Ok(Some(frame));
        }
        Ok(None)
    }

    /// Time left until `frame` is due, if pacing is on.
    fn time_until_due(&mut self, frame: &FrameResult) -> Option<Duration> {
        let speed = self.speed?;
        let (start, first_ns) = *self
            .clock
            .get_or_insert_with(|| (Instant::now(), frame.timestamp_ns));
        let offset = frame.timestamp_ns.saturating_sub(first_ns) as f64 * 1e-9 / speed;
        let due = start + Duration::from_secs_f64(offset);
        due.checked_duration_since(Instant::now())
    }
}

impl<R: BufRead> FrameSource for ReplayFrameSource<R> {
    fn wait_for_frame(&mut self, timeout: Duration) -> Result<FrameStatus> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.next_frame()? {
                Some(frame) => frame,
                None => return Ok(FrameStatus::Finished),
            },
        };

        if let Some(wait) = self.time_until_due(&frame) {
            if wait > timeout {
                thread::sleep(timeout);
                self.pending = Some(frame);
                return Ok(FrameStatus::Pending);
            }
            thread::sleep(wait);
        }

        self.current = frame;
        Ok(FrameStatus::Ready)
    }

    fn get_data(&self) -> &[PathPoint] {
        &self.current.path
    }

    fn get_frame_time(&self) -> u64 {
        self.current.timestamp_ns
    }

    fn get_image_offset(&self) -> ImageOffset {
        self.current.offset()
    }
}
