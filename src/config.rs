use crate::assets::{
    BLOCK_SIZE, CAPTURE_WORKERS, CHANNELS, EYE_HEIGHT, EYE_WIDTH, FRAME_RATE, LEFT_CAMERA_ID,
    QUEUE_CAPACITY, RIGHT_CAMERA_ID, SAMPLE_RATE, SEND_TIMEOUT_MS, STATS_INTERVAL_SECS,
};
use crate::compose::ChannelOrder;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where eye frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackend {
    /// `rpicam-vid` child process per camera, I420 on stdout.
    Rpicam,
    /// Synthetic frames, no hardware.
    TestPattern,
}

impl std::str::FromStr for CameraBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpicam" => Ok(CameraBackend::Rpicam),
            "test-pattern" | "pattern" => Ok(CameraBackend::TestPattern),
            other => Err(ConfigError::Invalid {
                field: "camera_backend",
                reason: format!("unknown backend `{other}`"),
            }),
        }
    }
}

/// Immutable session configuration, handed to every component at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub eye_width: u32,
    pub eye_height: u32,
    pub frame_rate: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per channel delivered by one microphone callback.
    pub block_size: u32,
    pub queue_capacity: usize,
    /// Cameras are mounted upside down and need a 180° turn.
    pub mount_inverted: bool,
    /// Native channel order of the camera devices.
    pub channel_order: ChannelOrder,
    pub send_timeout_ms: u64,
    pub capture_workers: usize,
    pub left_camera: u32,
    pub right_camera: u32,
    pub stats_interval_secs: u64,
    pub camera_backend: CameraBackend,
    /// Simulated per-read blocking time of the test-pattern cameras, 0 for none.
    pub pattern_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            eye_width: EYE_WIDTH,
            eye_height: EYE_HEIGHT,
            frame_rate: FRAME_RATE,
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            block_size: BLOCK_SIZE,
            queue_capacity: QUEUE_CAPACITY,
            mount_inverted: true,
            channel_order: ChannelOrder::Bgr,
            send_timeout_ms: SEND_TIMEOUT_MS,
            capture_workers: CAPTURE_WORKERS,
            left_camera: LEFT_CAMERA_ID,
            right_camera: RIGHT_CAMERA_ID,
            stats_interval_secs: STATS_INTERVAL_SECS,
            camera_backend: CameraBackend::Rpicam,
            pattern_latency_ms: 0,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        }

        if self.eye_width == 0 || self.eye_height == 0 {
            return invalid("eye_width/eye_height", "eye dimensions must be non-zero");
        }
        if self.frame_rate == 0 {
            return invalid("frame_rate", "must be at least 1");
        }
        if self.sample_rate == 0 {
            return invalid("sample_rate", "must be non-zero");
        }
        if self.channels == 0 {
            return invalid("channels", "must be at least 1");
        }
        if self.block_size == 0 {
            return invalid("block_size", "must be non-zero");
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity", "must be at least 1");
        }
        if self.send_timeout_ms == 0 {
            return invalid("send_timeout_ms", "must be non-zero");
        }
        if self.capture_workers < 2 {
            return invalid("capture_workers", "one worker per eye is required (>= 2)");
        }
        if self.left_camera == self.right_camera {
            return invalid("right_camera", "left and right eyes must use different cameras");
        }
        Ok(())
    }

    /// Target time between two published stereo frames.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }

    /// Wall time covered by one microphone block.
    pub fn block_period(&self) -> Duration {
        Duration::from_nanos(self.block_size as u64 * 1_000_000_000 / self.sample_rate.max(1) as u64)
    }

    pub fn pattern_latency(&self) -> Option<Duration> {
        (self.pattern_latency_ms > 0).then(|| Duration::from_millis(self.pattern_latency_ms))
    }

    pub fn stereo_size(&self) -> (u32, u32) {
        (self.eye_width * 2, self.eye_height)
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
