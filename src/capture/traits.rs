//! Traits for camera devices

use crate::capture::{Eye, RawFrame};
use crate::error::{CameraReadError, FrameReadError};
use log::info;
use std::sync::Arc;

/// Unblocks a `read_frame` pending on another thread. The interrupted read
/// returns an error; the device still has to be closed.
pub type ReadInterrupt = Arc<dyn Fn() + Send + Sync>;

/// A camera that can deliver one frame per blocking call.
///
/// Implementations may block for as long as the hardware needs; callers run
/// them on the blocking worker pool.
pub trait CameraDevice: Send {
    /// Short label for logs, e.g. `rpicam:0`.
    fn label(&self) -> String;

    /// Block until one full frame is available.
    fn read_frame(&mut self) -> Result<RawFrame, FrameReadError>;

    /// Release the device. Called exactly once by [`CameraHandle`].
    fn close(&mut self);

    /// Devices whose reads can block indefinitely hand out a way to abort them.
    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        None
    }
}

/// Owns an opened camera for one eye and guarantees it is closed exactly once,
/// whether explicitly or when the handle is dropped.
pub struct CameraHandle {
    eye: Eye,
    width: u32,
    height: u32,
    device: Box<dyn CameraDevice>,
    closed: bool,
}

impl CameraHandle {
    pub fn new(eye: Eye, width: u32, height: u32, device: Box<dyn CameraDevice>) -> Self {
        Self {
            eye,
            width,
            height,
            device,
            closed: false,
        }
    }

    pub fn eye(&self) -> Eye {
        self.eye
    }

    /// Blocking read with size and geometry checks against the configured eye size.
    pub fn read_frame(&mut self) -> Result<RawFrame, CameraReadError> {
        if self.closed {
            return Err(CameraReadError::Unavailable { eye: self.eye });
        }

        let frame = self
            .device
            .read_frame()
            .map_err(|e| CameraReadError::from_frame_error(self.eye, e))?;

        if frame.width != self.width || frame.height != self.height {
            return Err(CameraReadError::Geometry {
                eye: self.eye,
                width: frame.width,
                height: frame.height,
                expected_width: self.width,
                expected_height: self.height,
            });
        }

        let expected = frame.layout.frame_size(self.width, self.height);
        if frame.data.len() < expected {
            return Err(CameraReadError::ShortRead {
                eye: self.eye,
                expected,
                got: frame.data.len(),
            });
        }

        Ok(frame)
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.device.close();
        info!("{} camera ({}) closed", self.eye, self.device.label());
    }

    pub fn read_interrupt(&self) -> Option<ReadInterrupt> {
        self.device.read_interrupt()
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.close();
    }
}
