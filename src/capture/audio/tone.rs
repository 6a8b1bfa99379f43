use crate::capture::audio::{MicBridge, Microphone};
use crate::error::DeviceError;
use log::info;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TONE_HZ: f32 = 440.0;
const AMPLITUDE: f32 = 0.2 * i16::MAX as f32;

/// Stand-in microphone that emits a sine tone, one block per block period,
/// from its own thread.
pub struct ToneMicrophone {
    sample_rate: u32,
    channels: u16,
    block_size: u32,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ToneMicrophone {
    pub fn new(sample_rate: u32, channels: u16, block_size: u32) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
            stop_tx: None,
            worker: None,
        }
    }

    fn block_period(&self) -> Duration {
        Duration::from_nanos(self.block_size as u64 * 1_000_000_000 / self.sample_rate.max(1) as u64)
    }
}

impl Microphone for ToneMicrophone {
    fn start(&mut self, mut bridge: MicBridge) -> Result<(), DeviceError> {
        if self.worker.is_some() {
            return Err(DeviceError::Unavailable {
                name: "tone".into(),
                reason: "already started".into(),
            });
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let period = self.block_period();
        let (rate, channels, block) = (self.sample_rate, self.channels as usize, self.block_size as usize);

        let worker = thread::Builder::new()
            .name("tone-mic".into())
            .spawn(move || {
                let step = TONE_HZ * std::f32::consts::TAU / rate as f32;
                let mut phase = 0.0f32;
                let mut samples = vec![0i16; block * channels];
                // the stop channel doubles as an interruptible sleep
                while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(period) {
                    for frame in samples.chunks_exact_mut(channels) {
                        frame.fill((phase.sin() * AMPLITUDE) as i16);
                        phase = (phase + step) % std::f32::consts::TAU;
                    }
                    bridge.on_block(&samples);
                }
            })
            .map_err(|source| DeviceError::Spawn {
                program: "tone-mic".into(),
                source,
            })?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        info!("Tone microphone started ({} Hz, {} ch)", self.sample_rate, self.channels);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            info!("Tone microphone stopped");
        }
    }
}

impl Drop for ToneMicrophone {
    fn drop(&mut self) {
        self.stop();
    }
}
