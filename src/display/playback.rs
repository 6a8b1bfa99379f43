//! Local playback of remote audio
//!
//! Exactly one [`PlaybackWriter`] owns the playback device. Remote audio
//! consumers send it chunks over a bounded channel.

use crate::error::{DeviceError, WriteError};
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::types::AudioChunk;
use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An opened local output device.
pub trait PlaybackDevice: Send {
    fn write(&mut self, samples: &[i16]) -> Result<(), WriteError>;

    fn close(&mut self);
}

/// Open the output device for this build.
#[cfg(feature = "cpal")]
pub fn open_playback(sample_rate: u32, channels: u16) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
    Ok(Box::new(super::speaker::CpalPlayback::open(sample_rate, channels)?))
}

/// Open the output device for this build.
#[cfg(not(feature = "cpal"))]
pub fn open_playback(_sample_rate: u32, _channels: u16) -> Result<Box<dyn PlaybackDevice>, DeviceError> {
    Err(DeviceError::Unavailable {
        name: "playback".into(),
        reason: "built without the `cpal` feature".into(),
    })
}

/// Sole owner of the playback device.
///
/// If the device failed to open, the writer still drains its channel and
/// counts every chunk as discarded, so upstream consumers never stall.
pub struct PlaybackWriter {
    device: Option<Box<dyn PlaybackDevice>>,
    rx: mpsc::Receiver<AudioChunk>,
    health: Arc<PipelineHealth>,
}

impl PlaybackWriter {
    pub fn new(
        device: Result<Box<dyn PlaybackDevice>, DeviceError>,
        capacity: usize,
        health: Arc<PipelineHealth>,
    ) -> (Self, mpsc::Sender<AudioChunk>) {
        let device = match device {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Playback unavailable for this session, remote audio will be discarded: {}", e);
                None
            }
        };
        let (tx, rx) = mpsc::channel(capacity);
        (Self { device, rx, health }, tx)
    }

    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    fn write(&mut self, chunk: &AudioChunk) {
        let Some(device) = self.device.as_mut() else {
            self.health.record_remote_discarded();
            return;
        };
        match device.write(&chunk.samples) {
            Ok(()) => self.health.record_remote_played(),
            Err(e) => {
                self.health.record_playback_write_failure();
                warn!("Dropping remote audio chunk {}: {}", chunk.sequence, e);
            }
        }
    }

    /// Close the device. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            info!("Playback device closed");
        }
    }
}

#[async_trait]
impl PipelineStage for PlaybackWriter {
    async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                chunk = self.rx.recv() => match chunk {
                    Some(chunk) => self.write(&chunk),
                    None => break,
                },
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "playback"
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.rx.close();
        self.close();
        Ok(())
    }
}

impl Drop for PlaybackWriter {
    fn drop(&mut self) {
        self.close();
    }
}
