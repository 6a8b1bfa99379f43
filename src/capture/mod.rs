//! Camera capture module
//!
//! One camera per eye. Devices expose a blocking `read_frame`; the
//! [`CaptureOffloader`] moves those reads onto the blocking worker pool so the
//! cooperative scheduler never waits on hardware.

pub mod audio;
pub mod offloader;
mod pattern;
mod rpicam;
mod traits;

use crate::config::{CameraBackend, Config};
use crate::error::DeviceError;
use bytes::Bytes;
use std::fmt;
use std::time::Instant;

pub use offloader::CaptureOffloader;
pub use pattern::TestPatternCamera;
pub use rpicam::RpicamCamera;
pub use traits::{CameraDevice, CameraHandle, ReadInterrupt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eye::Left => write!(f, "left"),
            Eye::Right => write!(f, "right"),
        }
    }
}

/// Memory layout of a captured eye frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Three interleaved 8-bit channels per pixel, order given by the device.
    Packed24,
    /// Planar Y, U, V with 2x2 subsampled chroma.
    I420,
}

impl PixelLayout {
    /// Exact byte size of one frame.
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelLayout::Packed24 => w * h * 3,
            PixelLayout::I420 => {
                let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
                w * h + 2 * cw * ch
            }
        }
    }
}

/// One camera's captured image. Immutable once read.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub captured_at: Instant,
}

impl RawFrame {
    pub fn new(data: Bytes, width: u32, height: u32, layout: PixelLayout) -> Self {
        Self {
            data,
            width,
            height,
            layout,
            captured_at: Instant::now(),
        }
    }
}

/// Open the camera serving `eye` with the configured backend.
pub fn open_camera(config: &Config, eye: Eye) -> Result<Box<dyn CameraDevice>, DeviceError> {
    let id = match eye {
        Eye::Left => config.left_camera,
        Eye::Right => config.right_camera,
    };
    match config.camera_backend {
        CameraBackend::Rpicam => Ok(Box::new(RpicamCamera::open(
            id,
            config.eye_width,
            config.eye_height,
            config.frame_rate,
        )?)),
        CameraBackend::TestPattern => {
            let mut camera = TestPatternCamera::new(id, config.eye_width, config.eye_height);
            if let Some(latency) = config.pattern_latency() {
                camera = camera.with_latency(latency);
            }
            Ok(Box::new(camera))
        }
    }
}
