//! Wheel encoder odometry node.
//!
//! Replays a recorded encoder log through the differential drive integrator
//! and publishes one odometry record per sample, paced by the recorded
//! sample times.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::types::{Covariance6, Stamp, Vector3};
use crate::io::encoder_log::{EncoderLog, EncoderRecord};
use crate::io::messages::{
    Header, Odometry, Point, Pose, PoseWithCovariance, Twist, TwistWithCovariance,
};
use crate::io::streaming::Publisher;
use crate::sensors::odometry::{DiffDrive, DiffDriveConfig};
use crate::utils::{Rate, sleep_while_running};

/// Covariance diagonal of published wheel odometry.
pub const ENCODER_COVARIANCE: f64 = 0.2461;

#[derive(Debug, Clone)]
pub struct EncoderNodeConfig {
    pub drive: DiffDriveConfig,
    pub frame_id: String,
    pub child_frame_id: String,
    pub covariance: Covariance6,
    /// Multiplier on recorded timing; 0 publishes as fast as the rate allows.
    pub playback_speed: f64,
    pub publish_rate_hz: f64,
}

impl Default for EncoderNodeConfig {
    fn default() -> Self {
        Self {
            drive: DiffDriveConfig::default(),
            frame_id: "world_frame".to_string(),
            child_frame_id: "base_link".to_string(),
            covariance: Covariance6::diagonal(ENCODER_COVARIANCE),
            playback_speed: 1.0,
            publish_rate_hz: 100.0,
        }
    }
}

pub struct EncoderNode {
    config: EncoderNodeConfig,
    drive: DiffDrive,
    publisher: Box<dyn Publisher<Odometry> + Send>,
    running: Arc<AtomicBool>,
    seq: u32,
    publish_errors: u64,
}

impl EncoderNode {
    pub fn new(
        config: EncoderNodeConfig,
        publisher: Box<dyn Publisher<Odometry> + Send>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            drive: DiffDrive::new(config.drive),
            config,
            publisher,
            running,
            seq: 0,
            publish_errors: 0,
        }
    }

    pub fn drive(&self) -> &DiffDrive {
        &self.drive
    }

    /// Integrate one sample and publish the resulting odometry, stamped `stamp`.
    pub fn process_record(&mut self, record: &EncoderRecord, stamp: Stamp) -> Odometry {
        let pose = self.drive.update(record.right_ticks, record.left_ticks);
        let delta = self.drive.last_delta();

        let odometry = Odometry {
            header: Header::new(self.seq, stamp, self.config.frame_id.clone()),
            child_frame_id: self.config.child_frame_id.clone(),
            pose: PoseWithCovariance {
                pose: Pose {
                    position: Point::new(pose.x, pose.y, 0.0),
                    orientation: self.drive.orientation(),
                },
                covariance: self.config.covariance,
            },
            twist: TwistWithCovariance {
                twist: Twist {
                    linear: Vector3::new(delta.dx, delta.dy, 0.0),
                    angular: Vector3::new(0.0, 0.0, delta.dheading),
                },
                covariance: self.config.covariance,
            },
        };
        self.seq = self.seq.wrapping_add(1);

        if let Err(e) = self.publisher.publish(&odometry) {
            self.publish_errors += 1;
            log::warn!("Failed to publish odometry for {}: {}", record.filename, e);
        }
        odometry
    }

    /// Replay the whole log. Returns the number of samples processed.
    pub fn run(&mut self, log: &EncoderLog) -> usize {
        let Some(first) = log.records().first() else {
            log::warn!("Encoder log is empty");
            return 0;
        };
        let first_ms = first.time_ms;
        let start = Instant::now();
        let mut rate = Rate::new(self.config.publish_rate_hz);
        let mut processed = 0;

        for record in log.iter() {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if let Some(due) = self.due_offset(record.time_ms.saturating_sub(first_ms)) {
                let wait = due.saturating_sub(start.elapsed());
                if !sleep_while_running(wait, &self.running) {
                    break;
                }
            }

            self.process_record(record, Stamp::now());
            processed += 1;
            rate.sleep();
        }

        let pose = self.drive.pose();
        log::info!(
            "Encoder replay done: {} of {} samples, final pose ({:.3}, {:.3}, {:.3} rad), {} publish errors",
            processed,
            log.len(),
            pose.x,
            pose.y,
            pose.heading,
            self.publish_errors
        );
        processed
    }

    /// Wall-clock offset from replay start at which a sample recorded
    /// `offset_ms` after the first one is due.
    fn due_offset(&self, offset_ms: i64) -> Option<Duration> {
        let speed = self.config.playback_speed;
        if speed <= 0.0 || offset_ms <= 0 {
            return None;
        }
        Duration::try_from_secs_f64(offset_ms as f64 / 1000.0 / speed).ok()
    }
}
