//! Streaming session
//!
//! Wires the three paths together and owns the shutdown order:
//! video (pacing loop), microphone (bridge, queue, send stage) and remote
//! audio (router, consumers, playback writer).

use crate::assets::PLAYBACK_QUEUE_CAPACITY;
use crate::capture::audio::{MicBridge, Microphone};
use crate::capture::{CameraDevice, CameraHandle, CaptureOffloader, Eye};
use crate::config::Config;
use crate::display::{PlaybackDevice, PlaybackWriter};
use crate::error::{DeviceError, PipelineError};
use crate::pipeline::health::{HealthMonitor, PipelineHealth};
use crate::pipeline::pacing::PacingScheduler;
use crate::pipeline::queue::audio_queue;
use crate::pipeline::receiver::TrackRouter;
use crate::pipeline::sender::MicSendStage;
use crate::pipeline::stage::spawn_stage;
use crate::transport::{AudioSink, SessionEvents, VideoSink};
use log::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything a session needs from the outside, already opened.
pub struct SessionDevices {
    pub left_camera: Box<dyn CameraDevice>,
    pub right_camera: Box<dyn CameraDevice>,
    pub video_sink: Box<dyn VideoSink>,
    /// `None` disables the microphone path.
    pub microphone: Option<Box<dyn Microphone>>,
    pub audio_sink: Box<dyn AudioSink>,
    /// `None` when no remote session is attached.
    pub inbound: Option<SessionEvents>,
    /// Result of opening the playback device. A failure only disables playback.
    pub playback: Result<Box<dyn PlaybackDevice>, DeviceError>,
}

pub struct Session {
    cancel: CancellationToken,
    health: Arc<PipelineHealth>,
    pacing: Option<PacingScheduler>,
    mic_running: Arc<AtomicBool>,
    microphone: Option<Box<dyn Microphone>>,
    mic_task: Option<JoinHandle<MicSendStage>>,
    router_task: Option<JoinHandle<TrackRouter>>,
    playback_task: Option<JoinHandle<PlaybackWriter>>,
    monitor_task: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl Session {
    /// Validate the configuration, start the microphone and spawn the
    /// event-driven stages. Must be called inside a tokio runtime.
    ///
    /// On error nothing keeps running and every device passed in is closed.
    pub fn start(config: &Config, devices: SessionDevices, cancel: CancellationToken) -> Result<Self, PipelineError> {
        config.validate()?;
        let health = Arc::new(PipelineHealth::new());

        let (w, h) = (config.eye_width, config.eye_height);
        let offloader = CaptureOffloader::new(
            CameraHandle::new(Eye::Left, w, h, devices.left_camera),
            CameraHandle::new(Eye::Right, w, h, devices.right_camera),
        );
        let pacing = PacingScheduler::new(config, offloader, devices.video_sink, health.clone());

        // the microphone is the last thing that can fail at startup
        let mic_running = Arc::new(AtomicBool::new(true));
        let mut microphone = devices.microphone;
        let mut mic_stage = None;
        if let Some(mic) = microphone.as_mut() {
            let (producer, consumer) = audio_queue(config.queue_capacity);
            let bridge = MicBridge::new(producer, config.sample_rate, config.channels, health.clone());
            mic.start(bridge).map_err(PipelineError::Microphone)?;
            mic_stage = Some(MicSendStage::new(
                consumer,
                devices.audio_sink,
                mic_running.clone(),
                config.send_timeout(),
                health.clone(),
            ));
        }

        let mic_task = mic_stage.map(|stage| spawn_stage(stage, cancel.child_token()));

        let (writer, playback_tx) = PlaybackWriter::new(devices.playback, PLAYBACK_QUEUE_CAPACITY, health.clone());
        let router_task = devices.inbound.map(|events| {
            let router = TrackRouter::new(events, playback_tx, health.clone());
            spawn_stage(router, cancel.child_token())
        });
        let playback_task = Some(spawn_stage(writer, cancel.child_token()));

        let monitor = HealthMonitor::new(health.clone(), config.stats_interval());
        let monitor_cancel = cancel.child_token();
        let monitor_task = Some(tokio::spawn(async move { monitor.run(monitor_cancel).await }));

        info!(
            "Session started: {}x{} per eye @ {} fps, mic {}, remote audio {}",
            w,
            h,
            config.frame_rate,
            if mic_task.is_some() { "on" } else { "off" },
            if router_task.is_some() { "on" } else { "off" },
        );

        Ok(Self {
            cancel,
            health,
            pacing: Some(pacing),
            mic_running,
            microphone,
            mic_task,
            router_task,
            playback_task,
            monitor_task,
            shut_down: false,
        })
    }

    pub fn health(&self) -> &Arc<PipelineHealth> {
        &self.health
    }

    /// Drive the video loop until cancellation, `limit` frames, or a fatal
    /// capture error. Can only be called once.
    pub async fn run(&mut self, limit: Option<u64>) -> Result<u64, PipelineError> {
        let pacing = self.pacing.as_mut().ok_or(PipelineError::AlreadyRan)?;
        pacing.run(&self.cancel, limit).await
    }

    /// Stop everything in order. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Shutting down session");

        self.cancel.cancel();
        // closes both cameras and the video sink, waiting out a read in flight
        if let Some(mut pacing) = self.pacing.take() {
            pacing.shutdown().await;
        }

        self.mic_running.store(false, Ordering::Release);
        if let Some(mut mic) = self.microphone.take() {
            mic.stop();
        }
        join_stage("mic-send", self.mic_task.take()).await;
        join_stage("track-router", self.router_task.take()).await;
        join_stage("playback", self.playback_task.take()).await;
        join_stage("health-monitor", self.monitor_task.take()).await;

        info!("Session finished: {}", self.health.summary());
    }
}

async fn join_stage<T>(name: &str, task: Option<JoinHandle<T>>) {
    let Some(task) = task else {
        return;
    };
    if let Err(e) = task.await {
        error!("{} task did not finish cleanly: {}", name, e);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        // no async here: cancel, release what we own, abort the rest
        self.cancel.cancel();
        self.pacing.take();
        self.mic_running.store(false, Ordering::Release);
        if let Some(mut mic) = self.microphone.take() {
            mic.stop();
        }
        // aborted stages drop their state, which closes the devices they own
        if let Some(task) = self.mic_task.take() {
            task.abort();
        }
        if let Some(task) = self.router_task.take() {
            task.abort();
        }
        if let Some(task) = self.playback_task.take() {
            task.abort();
        }
        if let Some(task) = self.monitor_task.take() {
            task.abort();
        }
    }
}
