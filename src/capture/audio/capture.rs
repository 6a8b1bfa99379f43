//! Microphone capture through cpal
//!
//! The input stream is not `Send`, so it is built and kept alive on a
//! dedicated thread. The driver callback feeds the [`MicBridge`] directly.

use crate::capture::audio::{MicBridge, Microphone};
use crate::error::DeviceError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

pub struct CpalMicrophone {
    sample_rate: u32,
    channels: u16,
    block_size: u32,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalMicrophone {
    pub fn new(sample_rate: u32, channels: u16, block_size: u32) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
            stop_tx: None,
            worker: None,
        }
    }
}

fn build_stream(
    config: &cpal::StreamConfig,
    mut bridge: MicBridge,
) -> Result<cpal::Stream, DeviceError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| DeviceError::NotFound {
        name: "default input device".into(),
    })?;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                bridge.on_block(data);
            },
            |err| error!("Microphone stream error: {}", err),
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))?;

    stream.play().map_err(|e| DeviceError::Backend(e.to_string()))?;
    Ok(stream)
}

impl Microphone for CpalMicrophone {
    fn start(&mut self, bridge: MicBridge) -> Result<(), DeviceError> {
        if self.worker.is_some() {
            return Err(DeviceError::Unavailable {
                name: "microphone".into(),
                reason: "already started".into(),
            });
        }

        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(self.block_size),
        };

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), DeviceError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        // cpal requires a dedicated thread
        let worker = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match build_stream(&config, bridge) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Wait for stop
                let _ = stop_rx.recv();

                if let Err(e) = stream.pause() {
                    error!("Failed to pause microphone stream: {}", e);
                }
                drop(stream);
                info!("Microphone capture stopped");
            })
            .map_err(|source| DeviceError::Spawn {
                program: "mic-capture".into(),
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DeviceError::Backend("capture thread exited during setup".into()));
            }
        }

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        info!(
            "Microphone capture started ({} Hz, {} ch, {} frames per block)",
            self.sample_rate, self.channels, self.block_size
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CpalMicrophone {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::health::PipelineHealth;
    use crate::pipeline::queue::audio_queue;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    #[ignore = "requires a microphone"]
    fn test_captures_from_default_device() {
        let (tx, rx) = audio_queue(64);
        let mut mic = CpalMicrophone::new(48_000, 1, 480);
        mic.start(MicBridge::new(tx, 48_000, 1, Arc::new(PipelineHealth::new())))
            .unwrap();
        thread::sleep(Duration::from_millis(200));
        mic.stop();
        assert!(!rx.is_empty());
    }
}
