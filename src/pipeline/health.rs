//! Health counters for the streaming session

use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Session-wide counters.
///
/// Written from the pacing loop, the send and playback tasks, and the audio
/// driver thread, so every field is atomic.
#[derive(Default)]
pub struct PipelineHealth {
    frames_published: AtomicU64,
    pacing_overruns: AtomicU64,
    mic_chunks_sent: AtomicU64,
    /// Expected-lossy: queue full on enqueue.
    mic_chunks_dropped: AtomicU64,
    mic_send_failures: AtomicU64,
    remote_chunks_played: AtomicU64,
    /// Playback unavailable for the session.
    remote_chunks_discarded: AtomicU64,
    playback_write_failures: AtomicU64,
    video_tracks_ignored: AtomicU64,
}

impl PipelineHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overrun(&self) {
        self.pacing_overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mic_sent(&self) {
        self.mic_chunks_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Called from the audio driver thread. Must stay a single atomic add.
    pub fn record_mic_drop(&self) {
        self.mic_chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mic_send_failure(&self) {
        self.mic_send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_played(&self) {
        self.remote_chunks_played.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_discarded(&self) {
        self.remote_chunks_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_playback_write_failure(&self) {
        self.playback_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_video_track_ignored(&self) {
        self.video_tracks_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::Relaxed)
    }

    pub fn mic_chunks_dropped(&self) -> u64 {
        self.mic_chunks_dropped.load(Ordering::Relaxed)
    }

    pub fn mic_chunks_sent(&self) -> u64 {
        self.mic_chunks_sent.load(Ordering::Relaxed)
    }

    pub fn remote_chunks_played(&self) -> u64 {
        self.remote_chunks_played.load(Ordering::Relaxed)
    }

    pub fn remote_chunks_discarded(&self) -> u64 {
        self.remote_chunks_discarded.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> HealthSummary {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        HealthSummary {
            frames_published: load(&self.frames_published),
            pacing_overruns: load(&self.pacing_overruns),
            mic_chunks_sent: load(&self.mic_chunks_sent),
            mic_chunks_dropped: load(&self.mic_chunks_dropped),
            mic_send_failures: load(&self.mic_send_failures),
            remote_chunks_played: load(&self.remote_chunks_played),
            remote_chunks_discarded: load(&self.remote_chunks_discarded),
            playback_write_failures: load(&self.playback_write_failures),
            video_tracks_ignored: load(&self.video_tracks_ignored),
        }
    }
}

/// Snapshot of the health counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub frames_published: u64,
    pub pacing_overruns: u64,
    pub mic_chunks_sent: u64,
    pub mic_chunks_dropped: u64,
    pub mic_send_failures: u64,
    pub remote_chunks_played: u64,
    pub remote_chunks_discarded: u64,
    pub playback_write_failures: u64,
    pub video_tracks_ignored: u64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "video: {} frames ({} overruns) | mic: {} sent, {} dropped, {} failed | remote: {} played, {} discarded, {} write failures, {} video tracks ignored",
            self.frames_published,
            self.pacing_overruns,
            self.mic_chunks_sent,
            self.mic_chunks_dropped,
            self.mic_send_failures,
            self.remote_chunks_played,
            self.remote_chunks_discarded,
            self.playback_write_failures,
            self.video_tracks_ignored,
        )
    }
}

/// Logs a health summary periodically.
pub struct HealthMonitor {
    health: Arc<PipelineHealth>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(health: Arc<PipelineHealth>, interval: Duration) -> Self {
        Self { health, interval }
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;
        let mut last_dropped = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let summary = self.health.summary();
                    let new_drops = summary.mic_chunks_dropped - last_dropped;
                    last_dropped = summary.mic_chunks_dropped;
                    info!("Health: {} (+{} mic drops since last report)", summary, new_drops);
                }
            }
        }
    }
}
