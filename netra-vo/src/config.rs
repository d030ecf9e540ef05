//! Daemon configuration.
//!
//! Loaded from TOML. Every section and field is optional; missing values
//! take the defaults below, which carry the calibration of the current rig.
//!
//! ```toml
//! [vision]
//! pixel_scale = 0.0009712
//!
//! [frames]
//! world_frame = "world_frame"
//! camera_frame = "camera_frame"
//!
//! [transform_wait]
//! initial_delay_ms = 1000
//! max_attempts = 6          # 0 = wait until shutdown
//!
//! [[tf.static_transforms]]
//! parent = "base_link"
//! child = "camera_frame"
//! x = -0.067
//! y = 0.42665
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::types::{Covariance6, Quaternion, RigidTransform, Stamp, TransformStamped, Vector3};
use crate::engine::encoder_node::EncoderNodeConfig;
use crate::engine::vision_node::VisionNodeConfig;
use crate::sensors::odometry::{DiffDriveConfig, TurnSign};
use crate::utils::RetryPolicy;

/// Paths tried, in order, when no config file is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["netra-vo.toml", "/etc/netra-vo.toml"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vision: VisionSection,
    #[serde(default)]
    pub frames: FramesSection,
    #[serde(default)]
    pub camera_to_base: CameraMountSection,
    #[serde(default)]
    pub rates: RatesSection,
    #[serde(default)]
    pub transform_wait: TransformWaitSection,
    #[serde(default)]
    pub lookup: LookupSection,
    #[serde(default)]
    pub tf: TfSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub encoder: EncoderSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionSection {
    /// Meters per camera pixel
    pub pixel_scale: f64,
    /// Diagonal of the published pose and twist covariance
    pub covariance: f64,
    /// Child frame of the odometry record
    pub child_frame_id: String,
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            pixel_scale: 0.0009712,
            covariance: 1.9074e-5,
            child_frame_id: "vo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FramesSection {
    pub world_frame: String,
    pub camera_frame: String,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            world_frame: "world_frame".to_string(),
            camera_frame: "camera_frame".to_string(),
        }
    }
}

/// A rigid transform written out field by field. Omitted fields are identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformSection {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl TransformSection {
    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform::new(
            Vector3::new(self.x, self.y, self.z),
            Quaternion::new(self.qx, self.qy, self.qz, self.qw),
        )
    }
}

impl Default for TransformSection {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }
}

/// Camera mounting relative to the vehicle base.
///
/// Same fields as [`TransformSection`], but omitted fields fall back to the
/// measured mount rather than identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraMountSection {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl CameraMountSection {
    pub fn to_transform(&self) -> RigidTransform {
        TransformSection {
            x: self.x,
            y: self.y,
            z: self.z,
            qx: self.qx,
            qy: self.qy,
            qz: self.qz,
            qw: self.qw,
        }
        .to_transform()
    }
}

impl Default for CameraMountSection {
    fn default() -> Self {
        Self {
            x: -0.067,
            y: 0.42665,
            z: 0.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesSection {
    /// Point publishing rate
    pub publish_hz: f64,
    /// Longest single wait for a frame before checking for shutdown
    pub frame_poll_ms: u64,
}

impl Default for RatesSection {
    fn default() -> Self {
        Self {
            publish_hz: 100.0,
            frame_poll_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformWaitSection {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// 0 waits until shutdown
    pub max_attempts: u32,
}

impl Default for TransformWaitSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_attempts: policy.max_attempts.unwrap_or(0),
        }
    }
}

impl TransformWaitSection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            multiplier: self.multiplier,
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LookupSection {
    /// Back-to-back lookup failures tolerated before the node stops; 0 = never
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticTransformEntry {
    pub parent: String,
    pub child: String,
    #[serde(flatten)]
    pub transform: TransformSection,
}

impl StaticTransformEntry {
    pub fn to_stamped(&self) -> TransformStamped {
        TransformStamped::new(
            Stamp::ZERO,
            self.parent.clone(),
            self.child.clone(),
            self.transform.to_transform(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TfSection {
    /// History kept per transform edge
    pub cache_seconds: f64,
    pub static_transforms: Vec<StaticTransformEntry>,
}

impl Default for TfSection {
    fn default() -> Self {
        Self {
            cache_seconds: 100.0,
            static_transforms: Vec::new(),
        }
    }
}

impl TfSection {
    pub fn cache_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.cache_seconds).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Frames and transforms over UDP
    Udp,
    /// Frames from a JSON-lines recording
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub kind: SourceKind,
    /// UDP bind address for frames and transforms
    pub udp_bind: String,
    /// Recording replayed when `kind = "replay"`
    pub replay_file: Option<String>,
    /// Replay speed factor; 0 replays as fast as possible
    pub replay_speed: f64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            kind: SourceKind::Udp,
            udp_bind: "0.0.0.0:5600".to_string(),
            replay_file: None,
            replay_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// TCP stream server bind address
    pub bind_address: String,
    pub odometry_topic: String,
    pub odometry_queue: usize,
    pub points_topic: String,
    pub points_queue: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5557".to_string(),
            odometry_topic: "/vo".to_string(),
            odometry_queue: 50,
            points_topic: "/points".to_string(),
            points_queue: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncoderSection {
    pub log_file: Option<String>,
    /// Playback speed factor for recorded timing; 0 ignores recorded timing
    pub playback_speed: f64,
    pub wheel_radius: f64,
    pub ticks_per_revolution: u32,
    pub axle_length: f64,
    /// "clockwise" or "counter_clockwise" positive heading
    pub turn_sign: TurnSign,
    pub covariance: f64,
    pub topic: String,
    pub queue: usize,
    pub frame_id: String,
    pub child_frame_id: String,
    pub publish_hz: f64,
}

impl Default for EncoderSection {
    fn default() -> Self {
        let drive = DiffDriveConfig::default();
        Self {
            log_file: None,
            playback_speed: 1.0,
            wheel_radius: drive.wheel_radius,
            ticks_per_revolution: drive.ticks_per_revolution,
            axle_length: drive.axle_length,
            turn_sign: drive.turn_sign,
            covariance: 0.2461,
            topic: "odom".to_string(),
            queue: 50,
            frame_id: "world_frame".to_string(),
            child_frame_id: "base_link".to_string(),
            publish_hz: 100.0,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Parse TOML text. `origin` names the source in errors.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        basic_toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents, path)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given; otherwise the first readable default path,
    /// falling back to built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for path in DEFAULT_CONFIG_PATHS {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("{}", e),
            }
        }
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn vision_node_config(&self) -> VisionNodeConfig {
        VisionNodeConfig {
            pixel_scale: self.vision.pixel_scale,
            world_frame: self.frames.world_frame.clone(),
            camera_frame: self.frames.camera_frame.clone(),
            child_frame_id: self.vision.child_frame_id.clone(),
            camera_to_base: self.camera_to_base.to_transform(),
            covariance: Covariance6::diagonal(self.vision.covariance),
            publish_rate_hz: self.rates.publish_hz,
            transform_wait: self.transform_wait.policy(),
            max_consecutive_lookup_failures: (self.lookup.max_consecutive_failures > 0)
                .then_some(self.lookup.max_consecutive_failures),
        }
    }

    pub fn encoder_node_config(&self) -> EncoderNodeConfig {
        EncoderNodeConfig {
            drive: DiffDriveConfig {
                wheel_radius: self.encoder.wheel_radius,
                ticks_per_revolution: self.encoder.ticks_per_revolution,
                axle_length: self.encoder.axle_length,
                turn_sign: self.encoder.turn_sign,
            },
            frame_id: self.encoder.frame_id.clone(),
            child_frame_id: self.encoder.child_frame_id.clone(),
            covariance: Covariance6::diagonal(self.encoder.covariance),
            playback_speed: self.encoder.playback_speed,
            publish_rate_hz: self.encoder.publish_hz,
        }
    }

    pub fn frame_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.rates.frame_poll_ms.max(1))
    }
}
