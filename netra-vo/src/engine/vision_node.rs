//! Visual odometry publisher node.
//!
//! Turns each vision frame into one odometry record and a run of world-frame
//! trajectory points.
//!
//! # Per-frame flow
//!
//! ```text
//!  FrameResult
//!      │
//!      ├─► integrate offset ─► camera→base ─► publish Odometry        (always)
//!      │
//!      ├─► wait for world←camera availability (bounded backoff)
//!      │       └─ exhausted ─► TransformUnavailable (points skipped)
//!      │
//!      ├─► lookup world←camera at the frame stamp
//!      │       └─ failed ─► LookupFailed (points skipped)
//!      │
//!      └─► for each path point: scale ─► camera→world ─► publish PointStamped, rate sleep
//! ```
//!
//! Lookup failures are transient: the next frame tries again. Only a
//! configured limit of back-to-back failures stops the node.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::frames::{transform_point, yaw_to_quaternion};
use crate::core::types::{Covariance6, FrameResult, RigidTransform, Stamp, Vector3};
use crate::error::{Error, Result};
use crate::io::frame_source::{FrameSource, FrameStatus};
use crate::io::messages::{
    Header, Odometry, Point, PointStamped, Pose, PoseWithCovariance, Twist, TwistWithCovariance,
};
use crate::io::streaming::Publisher;
use crate::io::tf::TransformProvider;
use crate::sensors::odometry::{DEFAULT_PIXEL_SCALE, VisualOdometry};
use crate::utils::{Rate, RetryPolicy, WaitOutcome, wait_until};

/// Covariance diagonal of published visual odometry.
pub const VISION_COVARIANCE: f64 = 1.9074e-5;

/// Configuration for the vision node.
#[derive(Debug, Clone)]
pub struct VisionNodeConfig {
    /// Meters per camera pixel.
    pub pixel_scale: f64,
    /// Fixed frame odometry and points are expressed in.
    pub world_frame: String,
    /// Camera frame the path points are measured in.
    pub camera_frame: String,
    /// Child frame of the odometry record.
    pub child_frame_id: String,
    /// Camera mounting relative to the vehicle base.
    pub camera_to_base: RigidTransform,
    pub covariance: Covariance6,
    /// Point publishing rate in Hz.
    pub publish_rate_hz: f64,
    /// Backoff while the world←camera transform is not yet available.
    pub transform_wait: RetryPolicy,
    /// Stop after this many back-to-back lookup failures (`None` = never).
    pub max_consecutive_lookup_failures: Option<u32>,
}

impl Default for VisionNodeConfig {
    fn default() -> Self {
        Self {
            pixel_scale: DEFAULT_PIXEL_SCALE,
            world_frame: "world_frame".to_string(),
            camera_frame: "camera_frame".to_string(),
            child_frame_id: "vo".to_string(),
            camera_to_base: RigidTransform::from_translation(-0.067, 0.42665, 0.0),
            covariance: Covariance6::diagonal(VISION_COVARIANCE),
            publish_rate_hz: 100.0,
            transform_wait: RetryPolicy::default(),
            max_consecutive_lookup_failures: None,
        }
    }
}

/// Where the node is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    WaitingForTransform,
    PublishingPoints,
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Odometry and this many points were published.
    PointsPublished(usize),
    /// The transform never became available; only odometry was published.
    TransformUnavailable,
    /// The lookup at the frame stamp failed; only odometry was published.
    LookupFailed,
    /// Shutdown was requested mid-frame.
    Shutdown,
}

/// Counters over the node's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub frames: u64,
    pub odometry_published: u64,
    pub points_published: u64,
    pub frames_without_transform: u64,
    pub lookup_failures: u64,
    pub publish_errors: u64,
}

/// Result of trying to obtain world←camera for a frame.
enum Acquired {
    Transform(RigidTransform),
    Skip(FrameOutcome),
}

/// Output publishers of the vision node.
pub struct VisionOutputs {
    pub odometry: Box<dyn Publisher<Odometry> + Send>,
    pub points: Box<dyn Publisher<PointStamped> + Send>,
}

/// Visual odometry publisher.
pub struct VisionNode<P> {
    config: VisionNodeConfig,
    odometry: VisualOdometry,
    transforms: P,
    outputs: VisionOutputs,
    rate: Rate,
    running: Arc<AtomicBool>,
    state: NodeState,
    odometry_seq: u32,
    point_seq: u32,
    consecutive_lookup_failures: u32,
    stats: NodeStats,
}

impl<P: TransformProvider> VisionNode<P> {
    /// Create the node. Fails if the camera mounting transform is malformed.
    pub fn new(
        config: VisionNodeConfig,
        transforms: P,
        outputs: VisionOutputs,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        config.camera_to_base.validate()?;

        Ok(Self {
            odometry: VisualOdometry::new(config.pixel_scale),
            rate: Rate::new(config.publish_rate_hz),
            config,
            transforms,
            outputs,
            running,
            state: NodeState::WaitingForTransform,
            odometry_seq: 0,
            point_seq: 0,
            consecutive_lookup_failures: 0,
            stats: NodeStats::default(),
        })
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn odometry(&self) -> &VisualOdometry {
        &self.odometry
    }

    pub fn config(&self) -> &VisionNodeConfig {
        &self.config
    }

    /// Process frames from `source` until it finishes, shutdown is
    /// requested, or a fatal error occurs.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S, poll_timeout: Duration) -> Result<NodeStats> {
        log::info!(
            "Vision node running: {} <- {}, {:.0} Hz point rate",
            self.config.world_frame,
            self.config.camera_frame,
            self.config.publish_rate_hz
        );

        while self.running.load(Ordering::Relaxed) {
            match source.wait_for_frame(poll_timeout)? {
                FrameStatus::Ready => {
                    let frame = source.snapshot();
                    if self.process_frame(&frame)? == FrameOutcome::Shutdown {
                        break;
                    }
                }
                FrameStatus::Pending => continue,
                FrameStatus::Finished => {
                    log::info!("Frame source finished");
                    break;
                }
            }
        }

        log::info!(
            "Vision node stopped: {} frames, {} points, {} frames without transform, {} lookup failures",
            self.stats.frames,
            self.stats.points_published,
            self.stats.frames_without_transform,
            self.stats.lookup_failures
        );
        Ok(self.stats)
    }

    /// Handle one frame: integrate and publish odometry, then publish its
    /// path points in world coordinates if the transform can be found.
    pub fn process_frame(&mut self, frame: &FrameResult) -> Result<FrameOutcome> {
        self.stats.frames += 1;
        let stamp = frame.stamp();

        let pose = self.odometry.update(&frame.offset());
        let camera_to_base = &self.config.camera_to_base;
        let (base_dx, base_dy) = transform_point(frame.dx, frame.dy, camera_to_base)?;
        let (base_x, base_y) = transform_point(pose.x, pose.y, camera_to_base)?;

        let odometry = self.build_odometry(stamp, base_x, base_y, pose.heading, base_dx, base_dy, frame.angle);
        log::debug!(
            "Odometry at {:.6}: ({:.5}, {:.5}) heading {:.4}",
            stamp.as_secs_f64(),
            base_x,
            base_y,
            pose.heading
        );
        if let Err(e) = self.outputs.odometry.publish(&odometry) {
            self.stats.publish_errors += 1;
            log::warn!("Failed to publish odometry: {}", e);
        } else {
            self.stats.odometry_published += 1;
        }

        self.state = NodeState::WaitingForTransform;
        let camera_to_world = match self.acquire_transform(stamp)? {
            Acquired::Transform(transform) => transform,
            Acquired::Skip(outcome) => return Ok(outcome),
        };

        self.state = NodeState::PublishingPoints;
        let published = self.publish_points(frame, stamp, &camera_to_world);
        self.state = NodeState::WaitingForTransform;

        match published? {
            Some(n) => Ok(FrameOutcome::PointsPublished(n)),
            None => Ok(FrameOutcome::Shutdown),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_odometry(
        &mut self,
        stamp: Stamp,
        x: f64,
        y: f64,
        heading: f64,
        dx: f64,
        dy: f64,
        dheading: f64,
    ) -> Odometry {
        let seq = self.odometry_seq;
        self.odometry_seq = self.odometry_seq.wrapping_add(1);

        Odometry {
            header: Header::new(seq, stamp, self.config.world_frame.clone()),
            child_frame_id: self.config.child_frame_id.clone(),
            pose: PoseWithCovariance {
                pose: Pose {
                    position: Point::new(x, y, 0.0),
                    orientation: yaw_to_quaternion(heading),
                },
                covariance: self.config.covariance,
            },
            twist: TwistWithCovariance {
                twist: Twist {
                    linear: Vector3::new(dx, dy, 0.0),
                    angular: Vector3::new(0.0, 0.0, dheading),
                },
                covariance: self.config.covariance,
            },
        }
    }

    /// Wait for and look up world←camera at `stamp`.
    fn acquire_transform(&mut self, stamp: Stamp) -> Result<Acquired> {
        let world = self.config.world_frame.as_str();
        let camera = self.config.camera_frame.as_str();
        let what = format!("transform {} <- {}", world, camera);

        let transforms = &self.transforms;
        match wait_until(&self.config.transform_wait, &self.running, &what, || {
            transforms.can_transform(world, camera)
        }) {
            WaitOutcome::Ready => {}
            WaitOutcome::Exhausted { attempts } => {
                self.stats.frames_without_transform += 1;
                log::warn!(
                    "No {} after {} attempts, skipping points of frame at {:.6}",
                    what,
                    attempts,
                    stamp.as_secs_f64()
                );
                return Ok(Acquired::Skip(FrameOutcome::TransformUnavailable));
            }
            WaitOutcome::Shutdown => return Ok(Acquired::Skip(FrameOutcome::Shutdown)),
        }

        match self.transforms.lookup_transform(world, camera, stamp) {
            Ok(transform) => {
                self.consecutive_lookup_failures = 0;
                Ok(Acquired::Transform(transform))
            }
            Err(e) => {
                self.stats.lookup_failures += 1;
                self.consecutive_lookup_failures += 1;
                log::warn!(
                    "Lookup of {} at {:.6} failed ({} in a row): {}",
                    what,
                    stamp.as_secs_f64(),
                    self.consecutive_lookup_failures,
                    e
                );
                if let Some(max) = self.config.max_consecutive_lookup_failures
                    && self.consecutive_lookup_failures >= max
                {
                    return Err(Error::LookupRetriesExhausted {
                        failures: self.consecutive_lookup_failures,
                        last: e,
                    });
                }
                Ok(Acquired::Skip(FrameOutcome::LookupFailed))
            }
        }
    }

    /// Publish every path point in world coordinates. `Ok(None)` if shutdown
    /// interrupted the run.
    fn publish_points(
        &mut self,
        frame: &FrameResult,
        stamp: Stamp,
        camera_to_world: &RigidTransform,
    ) -> Result<Option<usize>> {
        let scale = self.config.pixel_scale;
        let mut published = 0;

        for point in &frame.path {
            if !self.running.load(Ordering::Relaxed) {
                return Ok(None);
            }

            let (x, y) = transform_point(point.x * scale, point.y * scale, camera_to_world)?;
            let msg = PointStamped {
                header: Header::new(self.point_seq, stamp, self.config.world_frame.clone()),
                point: Point::new(x, y, point.end_flag),
            };
            self.point_seq = self.point_seq.wrapping_add(1);

            log::trace!("Point ({:.5}, {:.5}) end {}", x, y, point.end_flag);
            match self.outputs.points.publish(&msg) {
                Ok(()) => {
                    published += 1;
                    self.stats.points_published += 1;
                }
                Err(e) => {
                    self.stats.publish_errors += 1;
                    log::warn!("Failed to publish point: {}", e);
                }
            }
            self.rate.sleep();
        }

        Ok(Some(published))
    }
}
