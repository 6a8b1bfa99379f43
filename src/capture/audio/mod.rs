//! Microphone capture
//!
//! Microphones push fixed-size sample blocks from a driver-owned thread into
//! a [`MicBridge`]. With the `cpal` feature the default input device is used;
//! otherwise a tone generator stands in for it.

mod bridge;
#[cfg(feature = "cpal")]
mod capture;
mod tone;

use crate::error::DeviceError;

pub use bridge::MicBridge;
#[cfg(feature = "cpal")]
pub use capture::CpalMicrophone;
pub use tone::ToneMicrophone;

/// A capture device that calls back once per block on its own thread.
pub trait Microphone: Send {
    /// Start delivering blocks to `bridge`. Fatal at startup if it fails.
    fn start(&mut self, bridge: MicBridge) -> Result<(), DeviceError>;

    /// Stop the device stream. Safe to call more than once.
    fn stop(&mut self);
}

/// The platform microphone for this build.
#[cfg(feature = "cpal")]
pub fn default_microphone(sample_rate: u32, channels: u16, block_size: u32) -> Box<dyn Microphone> {
    Box::new(CpalMicrophone::new(sample_rate, channels, block_size))
}

/// The platform microphone for this build.
#[cfg(not(feature = "cpal"))]
pub fn default_microphone(sample_rate: u32, channels: u16, block_size: u32) -> Box<dyn Microphone> {
    Box::new(ToneMicrophone::new(sample_rate, channels, block_size))
}
