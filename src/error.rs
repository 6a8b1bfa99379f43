//! Error types for the streaming pipeline.
//!
//! Errors follow the pipeline's failure classes:
//! - **Startup** ([`PipelineError::CameraOpen`], [`PipelineError::Microphone`],
//!   [`PipelineError::Config`]): the session never starts pacing.
//! - **Runtime-fatal** ([`PipelineError::CameraRead`]): capture cannot continue,
//!   the session shuts down and the error reaches the caller.
//! - **Transient** ([`SendError`], [`WriteError`]): logged and counted, the
//!   owning loop keeps going.

use std::path::PathBuf;

use crate::capture::Eye;

/// Failure to open or drive a local hardware device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device not found: {name}")]
    NotFound { name: String },

    #[error("device unavailable: {name} - {reason}")]
    Unavailable { name: String, reason: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An error from the audio backend (cpal).
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// What a camera device reports when a single frame read fails.
#[derive(Debug, thiserror::Error)]
pub enum FrameReadError {
    #[error("short read: got {got} of {expected} bytes")]
    Short { expected: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A camera read failed. Always fatal for the pacing loop.
#[derive(Debug, thiserror::Error)]
pub enum CameraReadError {
    #[error("{eye} camera returned {got} bytes, expected {expected}")]
    ShortRead { eye: Eye, expected: usize, got: usize },

    #[error("{eye} camera delivered {width}x{height}, expected {expected_width}x{expected_height}")]
    Geometry {
        eye: Eye,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("{eye} camera device error: {source}")]
    Device {
        eye: Eye,
        #[source]
        source: std::io::Error,
    },

    #[error("{eye} camera is not available")]
    Unavailable { eye: Eye },

    #[error("{eye} capture worker failed: {message}")]
    Worker { eye: Eye, message: String },
}

impl CameraReadError {
    pub(crate) fn from_frame_error(eye: Eye, err: FrameReadError) -> Self {
        match err {
            FrameReadError::Short { expected, got } => CameraReadError::ShortRead { eye, expected, got },
            FrameReadError::Io(source) => CameraReadError::Device { eye, source },
        }
    }
}

/// An outbound audio chunk could not be handed to the transport.
#[derive(Debug, thiserror::Error)]
#[error("audio send failed: {0}")]
pub struct SendError(pub String);

/// A chunk could not be written to the local playback device.
#[derive(Debug, thiserror::Error)]
#[error("playback write failed: {0}")]
pub struct WriteError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level pipeline error surfaced to the caller of a session.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to open {eye} camera: {source}")]
    CameraOpen {
        eye: Eye,
        #[source]
        source: DeviceError,
    },

    #[error(transparent)]
    CameraRead(#[from] CameraReadError),

    #[error("microphone failed to start: {0}")]
    Microphone(#[source] DeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("the pacing loop has already run for this session")]
    AlreadyRan,
}

impl PipelineError {
    /// Whether the error stopped an already running pipeline.
    pub fn is_fatal_runtime(&self) -> bool {
        matches!(self, PipelineError::CameraRead(_))
    }
}
