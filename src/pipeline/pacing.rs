//! Fixed-cadence video loop.
//!
//! One iteration per frame period: capture both eyes on the worker pool,
//! compose, publish. Whatever is left of the period is slept away. An
//! iteration that overruns only yields once and the next one starts right
//! away; lost time is never caught up.

use crate::assets::STREAM_LOG_SECONDS;
use crate::capture::CaptureOffloader;
use crate::compose::{ComposeOpts, FrameComposer};
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::state::PacingPhase;
use crate::transport::VideoSink;
use crate::utils::perf::PacingStats;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What to do once an iteration has published its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingDecision {
    /// Suspend for the rest of the period.
    Sleep(Duration),
    /// Over budget: give other tasks one turn, then continue immediately.
    Yield,
}

pub fn pace(period: Duration, elapsed: Duration) -> PacingDecision {
    if elapsed < period {
        PacingDecision::Sleep(period - elapsed)
    } else {
        PacingDecision::Yield
    }
}

pub struct PacingScheduler {
    period: Duration,
    offloader: CaptureOffloader,
    composer: FrameComposer,
    sink: Box<dyn VideoSink>,
    phase: PacingPhase,
    health: Arc<PipelineHealth>,
    stats: PacingStats,
    published: u64,
    log_every: u64,
}

impl PacingScheduler {
    pub fn new(
        config: &Config,
        offloader: CaptureOffloader,
        sink: Box<dyn VideoSink>,
        health: Arc<PipelineHealth>,
    ) -> Self {
        let composer = FrameComposer::new(ComposeOpts::from_config(config, sink.required_layout()));
        Self {
            period: config.frame_period(),
            offloader,
            composer,
            sink,
            phase: PacingPhase::Idle,
            health,
            stats: PacingStats::new(),
            published: 0,
            log_every: (config.frame_rate as u64 * STREAM_LOG_SECONDS).max(1),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn phase(&self) -> PacingPhase {
        self.phase
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    fn transition(&mut self, next: PacingPhase) {
        debug_assert!(
            self.phase.can_transition_to(&next),
            "invalid pacing transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    /// Run until cancelled, until `limit` frames were published, or until a
    /// camera read fails. Cameras and sink are released before returning.
    ///
    /// Returns the number of frames published.
    pub async fn run(&mut self, cancel: &CancellationToken, limit: Option<u64>) -> Result<u64, PipelineError> {
        if self.phase.is_stopped() {
            return Err(PipelineError::AlreadyRan);
        }
        info!(
            "Pacing started: period {:.2} ms, composer {:?}",
            self.period.as_secs_f64() * 1000.0,
            self.composer.opts()
        );

        let result = self.iterate(cancel, limit).await;
        if let Err(e) = &result {
            error!("Stopping video pipeline: {}", e);
        }
        self.shutdown().await;
        result.map(|()| self.published)
    }

    async fn iterate(&mut self, cancel: &CancellationToken, limit: Option<u64>) -> Result<(), PipelineError> {
        loop {
            if limit.is_some_and(|n| self.published >= n) || cancel.is_cancelled() {
                return Ok(());
            }

            let started_at = Instant::now();
            self.transition(PacingPhase::Capturing { started_at });

            let captured = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                res = self.offloader.capture() => res,
            };
            let (left, right) = captured?;
            let capture_time = started_at.elapsed();

            let t = Instant::now();
            let frame = self.composer.compose(&left, &right, self.published);
            let compose_time = t.elapsed();

            let t = Instant::now();
            self.sink.publish(frame);
            let publish_time = t.elapsed();

            self.published += 1;
            self.health.record_frame_published();
            self.transition(PacingPhase::Idle);

            let decision = pace(self.period, started_at.elapsed());
            let overrun = decision == PacingDecision::Yield;
            if overrun {
                self.health.record_overrun();
            }
            self.stats.record(capture_time, compose_time, publish_time, overrun);

            if self.published % self.log_every == 0 {
                info!("Streamed {} frames", self.published);
                self.stats.log_summary();
            }

            match decision {
                PacingDecision::Sleep(remaining) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(remaining) => {}
                    }
                }
                PacingDecision::Yield => tokio::task::yield_now().await,
            }
        }
    }

    /// Like [`PacingScheduler::stop`], but a camera read cut off by
    /// cancellation is interrupted and awaited, so both cameras are closed
    /// when this returns.
    pub async fn shutdown(&mut self) {
        if self.phase.is_stopped() {
            return;
        }
        self.offloader.release().await;
        self.stop();
    }

    /// Release both cameras and close the sink. Runs once; later calls do nothing.
    pub fn stop(&mut self) {
        if self.phase.is_stopped() {
            return;
        }
        if self.phase.iteration_start().is_some() {
            warn!("Pacing stopped mid-iteration");
        }
        self.phase = PacingPhase::Stopped;
        self.offloader.release_now();
        self.sink.close();
        info!("Pacing stopped after {} frames", self.published);
    }
}

impl Drop for PacingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
