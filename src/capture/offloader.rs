//! Runs the blocking per-eye camera reads on the worker pool.

use crate::capture::{CameraHandle, Eye, RawFrame, ReadInterrupt};
use crate::error::CameraReadError;
use log::{info, warn};
use tokio::task::JoinHandle;

type ReadTask = JoinHandle<(CameraHandle, Result<RawFrame, CameraReadError>)>;

/// One eye's camera, either parked here or lent to a blocking read.
struct EyeSlot {
    eye: Eye,
    camera: Option<CameraHandle>,
    pending: Option<ReadTask>,
    interrupt: Option<ReadInterrupt>,
}

impl EyeSlot {
    fn new(camera: CameraHandle) -> Self {
        Self {
            eye: camera.eye(),
            interrupt: camera.read_interrupt(),
            camera: Some(camera),
            pending: None,
        }
    }

    /// Lend the camera to a blocking read, unless one is already in flight.
    fn start(&mut self) -> Result<(), CameraReadError> {
        if self.pending.is_some() {
            return Ok(());
        }
        let mut camera = self.camera.take().ok_or(CameraReadError::Unavailable { eye: self.eye })?;
        self.pending = Some(tokio::task::spawn_blocking(move || {
            let frame = camera.read_frame();
            (camera, frame)
        }));
        Ok(())
    }

    /// Await the read started by [`EyeSlot::start`]. Cancel safe: dropping
    /// this future leaves the read in `pending`.
    async fn finish(&mut self) -> Result<RawFrame, CameraReadError> {
        let task = self.pending.as_mut().ok_or(CameraReadError::Unavailable { eye: self.eye })?;
        let joined = task.await;
        self.pending = None;
        match joined {
            Ok((camera, frame)) => {
                self.camera = Some(camera);
                frame
            }
            Err(e) => Err(CameraReadError::Worker {
                eye: self.eye,
                message: e.to_string(),
            }),
        }
    }

    async fn release(&mut self) -> bool {
        let mut released = self.camera.take().is_some();
        if let Some(task) = self.pending.take() {
            self.interrupt_read();
            match task.await {
                Ok((camera, _)) => drop(camera),
                Err(e) => warn!("{} camera read worker failed: {}", self.eye, e),
            }
            released = true;
        }
        released
    }

    fn release_now(&mut self) -> bool {
        let mut released = self.camera.take().is_some();
        if self.pending.take().is_some() {
            // the worker drops, and so closes, the camera once the read returns
            self.interrupt_read();
            released = true;
        }
        released
    }

    fn interrupt_read(&self) {
        if let Some(interrupt) = &self.interrupt {
            interrupt();
        }
    }
}

/// Owns both eye cameras, including while they are lent to a blocking read.
pub struct CaptureOffloader {
    left: EyeSlot,
    right: EyeSlot,
}

impl CaptureOffloader {
    pub fn new(left: CameraHandle, right: CameraHandle) -> Self {
        debug_assert_eq!(left.eye(), Eye::Left);
        debug_assert_eq!(right.eye(), Eye::Right);
        Self {
            left: EyeSlot::new(left),
            right: EyeSlot::new(right),
        }
    }

    /// Read one frame from each camera concurrently on the blocking pool.
    ///
    /// Returns only after both reads finished. Any failure is fatal for the
    /// caller. If the returned future is dropped, the reads stay owned by the
    /// offloader: the next `capture` resumes them and `release` closes them.
    pub async fn capture(&mut self) -> Result<(RawFrame, RawFrame), CameraReadError> {
        self.left.start()?;
        self.right.start()?;

        let (left, right) = tokio::join!(self.left.finish(), self.right.finish());
        Ok((left?, right?))
    }

    /// Close both cameras. A read still in flight is interrupted and awaited
    /// first, so both devices are closed when this returns. Safe to call more
    /// than once.
    pub async fn release(&mut self) {
        let (left, right) = tokio::join!(self.left.release(), self.right.release());
        if left || right {
            info!("Capture offloader released cameras");
        }
    }

    /// Non-async release for drop paths. Parked cameras close immediately; a
    /// camera lent to a read is interrupted and closed by its worker.
    pub fn release_now(&mut self) {
        let left = self.left.release_now();
        let right = self.right.release_now();
        if left || right {
            info!("Capture offloader released cameras");
        }
    }

    pub fn holds_cameras(&self) -> bool {
        self.left.camera.is_some() && self.right.camera.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCamera;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    fn offloader(left: MockCamera, right: MockCamera) -> CaptureOffloader {
        CaptureOffloader::new(
            CameraHandle::new(Eye::Left, 4, 2, Box::new(left)),
            CameraHandle::new(Eye::Right, 4, 2, Box::new(right)),
        )
    }

    #[tokio::test]
    async fn test_capture_returns_one_frame_per_eye() {
        let mut off = offloader(MockCamera::new(4, 2).with_fill(1), MockCamera::new(4, 2).with_fill(2));

        let (left, right) = off.capture().await.unwrap();
        assert!(left.data.iter().all(|&b| b == 1));
        assert!(right.data.iter().all(|&b| b == 2));
        assert!(off.holds_cameras());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_reads_run_concurrently() {
        let delay = Duration::from_millis(120);
        let mut off = offloader(
            MockCamera::new(4, 2).with_delay(delay),
            MockCamera::new(4, 2).with_delay(delay),
        );

        let started = Instant::now();
        off.capture().await.unwrap();
        // sequential reads would need at least 2 * delay
        assert!(started.elapsed() < delay * 2);
    }

    #[tokio::test]
    async fn test_scheduler_keeps_running_during_blocking_read() {
        let mut off = offloader(
            MockCamera::new(4, 2).with_delay(Duration::from_millis(100)),
            MockCamera::new(4, 2),
        );

        let ticks = std::rc::Rc::new(std::cell::Cell::new(0u32));
        let counter = ticks.clone();
        let ticker = async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.set(counter.get() + 1);
            }
        };

        tokio::select! {
            res = off.capture() => { res.unwrap(); }
            _ = ticker => unreachable!(),
        }
        assert!(ticks.get() > 3, "only {} ticks while reading", ticks.get());
    }

    #[tokio::test]
    async fn test_short_read_is_fatal_and_keeps_handles() {
        let mut off = offloader(MockCamera::new(4, 2), MockCamera::new(4, 2).truncate_to(3));

        let err = off.capture().await.unwrap_err();
        assert!(matches!(err, CameraReadError::ShortRead { eye: Eye::Right, got: 3, .. }));
        assert!(off.holds_cameras());
    }

    #[tokio::test]
    async fn test_release_closes_each_camera_once() {
        let left = MockCamera::new(4, 2);
        let right = MockCamera::new(4, 2);
        let (lc, rc) = (left.closes(), right.closes());
        let mut off = offloader(left, right);

        off.capture().await.unwrap();
        off.release().await;
        off.release().await;

        assert_eq!(lc.load(Ordering::SeqCst), 1);
        assert_eq!(rc.load(Ordering::SeqCst), 1);
        assert!(matches!(off.capture().await, Err(CameraReadError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_release_waits_for_read_in_flight() {
        let delay = Duration::from_millis(150);
        let left = MockCamera::new(4, 2).with_delay(delay);
        let right = MockCamera::new(4, 2).with_delay(delay);
        let (lc, rc) = (left.closes(), right.closes());
        let mut off = offloader(left, right);

        let cancelled = tokio::time::timeout(Duration::from_millis(20), off.capture()).await;
        assert!(cancelled.is_err());
        assert!(!off.holds_cameras());

        off.release().await;
        assert_eq!(lc.load(Ordering::SeqCst), 1);
        assert_eq!(rc.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_interrupts_blocked_read() {
        let left = MockCamera::new(4, 2).with_delay(Duration::from_secs(30)).interruptible();
        let right = MockCamera::new(4, 2).with_delay(Duration::from_secs(30)).interruptible();
        let (lc, rc) = (left.closes(), right.closes());
        let mut off = offloader(left, right);

        let started = Instant::now();
        let cancelled = tokio::time::timeout(Duration::from_millis(20), off.capture()).await;
        assert!(cancelled.is_err());

        off.release().await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(lc.load(Ordering::SeqCst), 1);
        assert_eq!(rc.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupted_capture_resumes_on_next_call() {
        let mut off = offloader(
            MockCamera::new(4, 2).with_fill(3).with_delay(Duration::from_millis(60)),
            MockCamera::new(4, 2).with_fill(4),
        );

        let cancelled = tokio::time::timeout(Duration::from_millis(10), off.capture()).await;
        assert!(cancelled.is_err());

        let (left, right) = off.capture().await.unwrap();
        assert!(left.data.iter().all(|&b| b == 3));
        assert!(right.data.iter().all(|&b| b == 4));
        assert!(off.holds_cameras());
    }
}
