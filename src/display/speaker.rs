//! Audio output through cpal

use crate::display::audio_buffer::SampleRing;
use crate::display::playback::PlaybackDevice;
use crate::error::{DeviceError, WriteError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};

/// Roughly 200 ms of buffered output per channel at 48 kHz.
const RING_SAMPLES_PER_CHANNEL: usize = 9600;

/// Default output device fed from a [`SampleRing`].
///
/// The cpal stream lives on its own thread; `write` only touches the ring.
pub struct CpalPlayback {
    ring: Arc<Mutex<SampleRing>>,
    failed: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalPlayback {
    pub fn open(sample_rate: u32, channels: u16) -> Result<Self, DeviceError> {
        let ring = Arc::new(Mutex::new(SampleRing::new(
            RING_SAMPLES_PER_CHANNEL * channels as usize,
        )));
        let failed = Arc::new(AtomicBool::new(false));
        let config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), DeviceError>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (stream_ring, stream_failed) = (ring.clone(), failed.clone());

        let worker = thread::Builder::new()
            .name("playback".into())
            .spawn(move || {
                let stream = match build_stream(&config, stream_ring, stream_failed) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|source| DeviceError::Spawn {
                program: "playback".into(),
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
                return Err(DeviceError::Backend("playback thread exited during setup".into()));
            }
        }

        info!("Playback opened ({} Hz, {} ch)", sample_rate, channels);
        Ok(Self {
            ring,
            failed,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }
}

fn build_stream(
    config: &cpal::StreamConfig,
    ring: Arc<Mutex<SampleRing>>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, DeviceError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or_else(|| DeviceError::NotFound {
        name: "default output device".into(),
    })?;

    let stream = device
        .build_output_stream(
            config,
            move |output: &mut [i16], _: &cpal::OutputCallbackInfo| {
                if let Ok(mut ring) = ring.lock() {
                    ring.read(output);
                } else {
                    output.fill(0);
                }
            },
            move |err| {
                error!("Audio output error: {}", err);
                failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| DeviceError::Backend(e.to_string()))?;

    stream.play().map_err(|e| DeviceError::Backend(e.to_string()))?;
    Ok(stream)
}

impl PlaybackDevice for CpalPlayback {
    fn write(&mut self, samples: &[i16]) -> Result<(), WriteError> {
        if self.failed.load(Ordering::Relaxed) {
            return Err(WriteError("output stream failed".into()));
        }
        let mut ring = self
            .ring
            .lock()
            .map_err(|_| WriteError("sample ring poisoned".into()))?;
        ring.push(samples);
        Ok(())
    }

    fn close(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.close();
    }
}
