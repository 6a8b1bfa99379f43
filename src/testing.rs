//! Test doubles for hardware and transport collaborators.

use crate::capture::audio::{MicBridge, Microphone};
use crate::capture::{CameraDevice, PixelLayout, RawFrame, ReadInterrupt};
use crate::display::PlaybackDevice;
use crate::error::{DeviceError, FrameReadError, SendError, WriteError};
use crate::pipeline::queue::PushOutcome;
use crate::pipeline::types::{AudioChunk, OutputLayout, StereoFrame};
use crate::transport::{AudioSink, VideoSink};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub type Counter = Arc<AtomicUsize>;

/// Camera delivering packed frames filled with a constant byte.
pub struct MockCamera {
    width: u32,
    height: u32,
    fill: u8,
    truncate: Option<usize>,
    delay: Option<Duration>,
    interrupted: Option<Arc<(Mutex<bool>, Condvar)>>,
    fail_after: Option<u64>,
    reads: u64,
    closes: Counter,
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: 0,
            truncate: None,
            delay: None,
            interrupted: None,
            fail_after: None,
            reads: 0,
            closes: Counter::default(),
        }
    }

    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Every frame comes back with only `len` bytes.
    pub fn truncate_to(mut self, len: usize) -> Self {
        self.truncate = Some(len);
        self
    }

    /// Each read blocks the calling thread for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The delay can be cut short through [`CameraDevice::read_interrupt`];
    /// the interrupted read reports a closed stream.
    pub fn interruptible(mut self) -> Self {
        self.interrupted = Some(Arc::new((Mutex::new(false), Condvar::new())));
        self
    }

    /// Reads after the first `n` report a closed stream.
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn closes(&self) -> Counter {
        self.closes.clone()
    }
}

impl CameraDevice for MockCamera {
    fn label(&self) -> String {
        "mock".into()
    }

    fn read_frame(&mut self) -> Result<RawFrame, FrameReadError> {
        let size = PixelLayout::Packed24.frame_size(self.width, self.height);
        match (self.delay, &self.interrupted) {
            (Some(delay), Some(flag)) => {
                let (lock, cvar) = &**flag;
                let guard = lock.lock().unwrap();
                let (guard, _) = cvar.wait_timeout_while(guard, delay, |hit| !*hit).unwrap();
                if *guard {
                    return Err(FrameReadError::Short { expected: size, got: 0 });
                }
            }
            (Some(delay), None) => std::thread::sleep(delay),
            _ => {}
        }
        if self.fail_after.is_some_and(|n| self.reads >= n) {
            return Err(FrameReadError::Short { expected: size, got: 0 });
        }
        self.reads += 1;

        let len = self.truncate.map_or(size, |t| t.min(size));
        Ok(RawFrame::new(
            Bytes::from(vec![self.fill; len]),
            self.width,
            self.height,
            PixelLayout::Packed24,
        ))
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        let flag = self.interrupted.clone()?;
        Some(Arc::new(move || {
            let (lock, cvar) = &*flag;
            *lock.lock().unwrap() = true;
            cvar.notify_all();
        }))
    }
}

#[derive(Debug, Clone)]
pub struct PublishRecord {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub at: tokio::time::Instant,
}

/// Video sink remembering when each frame was published.
pub struct RecordingVideoSink {
    layout: OutputLayout,
    log: Arc<Mutex<Vec<PublishRecord>>>,
    closes: Counter,
}

impl RecordingVideoSink {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            log: Arc::default(),
            closes: Counter::default(),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<PublishRecord>>> {
        self.log.clone()
    }

    pub fn closes(&self) -> Counter {
        self.closes.clone()
    }
}

impl VideoSink for RecordingVideoSink {
    fn required_layout(&self) -> OutputLayout {
        self.layout
    }

    fn publish(&mut self, frame: StereoFrame) {
        assert_eq!(frame.layout, self.layout);
        self.log.lock().unwrap().push(PublishRecord {
            sequence: frame.sequence,
            width: frame.width,
            height: frame.height,
            at: tokio::time::Instant::now(),
        });
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Audio sink keeping every chunk it accepted. Calls listed in `fail_on`
/// (0-based) are rejected.
pub struct RecordingAudioSink {
    sent: Arc<Mutex<Vec<AudioChunk>>>,
    fail_on: Vec<usize>,
    calls: usize,
    closes: Counter,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self {
            sent: Arc::default(),
            fail_on: Vec::new(),
            calls: 0,
            closes: Counter::default(),
        }
    }

    pub fn fail_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    pub fn sent(&self) -> Arc<Mutex<Vec<AudioChunk>>> {
        self.sent.clone()
    }

    pub fn closes(&self) -> Counter {
        self.closes.clone()
    }
}

#[async_trait]
impl AudioSink for RecordingAudioSink {
    async fn send(&mut self, chunk: AudioChunk) -> Result<(), SendError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(SendError(format!("call {call} rejected")));
        }
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Playback device keeping every write. Writes listed in `fail_on` fail.
pub struct RecordingPlayback {
    written: Arc<Mutex<Vec<Vec<i16>>>>,
    fail_on: Vec<usize>,
    calls: usize,
    closes: Counter,
}

impl RecordingPlayback {
    pub fn new() -> Self {
        Self {
            written: Arc::default(),
            fail_on: Vec::new(),
            calls: 0,
            closes: Counter::default(),
        }
    }

    pub fn fail_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    pub fn written(&self) -> Arc<Mutex<Vec<Vec<i16>>>> {
        self.written.clone()
    }

    pub fn closes(&self) -> Counter {
        self.closes.clone()
    }
}

impl PlaybackDevice for RecordingPlayback {
    fn write(&mut self, samples: &[i16]) -> Result<(), WriteError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(WriteError(format!("write {call} rejected")));
        }
        self.written.lock().unwrap().push(samples.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Microphone whose blocks are pushed by the test through [`MicFeed`].
pub struct MockMicrophone {
    bridge: Arc<Mutex<Option<MicBridge>>>,
    fail_start: bool,
    stops: Counter,
}

/// Test-side handle of a [`MockMicrophone`].
#[derive(Clone)]
pub struct MicFeed {
    bridge: Arc<Mutex<Option<MicBridge>>>,
    stops: Counter,
}

impl MicFeed {
    /// Deliver one block as the driver callback would. `None` when stopped.
    pub fn push(&self, samples: &[i16]) -> Option<PushOutcome> {
        self.bridge.lock().unwrap().as_mut().map(|b| b.on_block(samples))
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MockMicrophone {
    pub fn new() -> (Self, MicFeed) {
        let bridge = Arc::new(Mutex::new(None));
        let stops = Counter::default();
        (
            Self {
                bridge: bridge.clone(),
                fail_start: false,
                stops: stops.clone(),
            },
            MicFeed { bridge, stops },
        )
    }

    pub fn failing() -> Self {
        let (mut mic, _) = Self::new();
        mic.fail_start = true;
        mic
    }
}

impl Microphone for MockMicrophone {
    fn start(&mut self, bridge: MicBridge) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::NotFound { name: "mock mic".into() });
        }
        *self.bridge.lock().unwrap() = Some(bridge);
        Ok(())
    }

    fn stop(&mut self) {
        if self.bridge.lock().unwrap().take().is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}
