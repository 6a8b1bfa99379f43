//! Dispatches inbound tracks by kind.

use crate::pipeline::health::PipelineHealth;
use crate::pipeline::receiver::consumer::RemoteAudioConsumer;
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::types::{AudioChunk, TrackKind};
use crate::transport::{RemoteTrack, SessionEvent, SessionEvents};
use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Spawns at most one [`RemoteAudioConsumer`] per audio track. Remote video
/// is never rendered; those tracks are only logged and counted.
pub struct TrackRouter {
    events: SessionEvents,
    playback: mpsc::Sender<AudioChunk>,
    health: Arc<PipelineHealth>,
    consumers: JoinSet<String>,
    task_tracks: HashMap<Id, String>,
    active: HashMap<String, CancellationToken>,
}

impl TrackRouter {
    pub fn new(events: SessionEvents, playback: mpsc::Sender<AudioChunk>, health: Arc<PipelineHealth>) -> Self {
        Self {
            events,
            playback,
            health,
            consumers: JoinSet::new(),
            task_tracks: HashMap::new(),
            active: HashMap::new(),
        }
    }

    pub fn active_tracks(&self) -> usize {
        self.active.len()
    }

    fn on_track(&mut self, track: RemoteTrack, cancel: &CancellationToken) {
        match track.kind {
            TrackKind::Audio => {
                if self.active.contains_key(&track.id) {
                    warn!("Audio track {} already has a consumer, ignoring", track.id);
                    return;
                }
                let Some(frames) = track.frames else {
                    warn!("Audio track {} carries no frames", track.id);
                    return;
                };

                let token = cancel.child_token();
                let consumer = RemoteAudioConsumer::new(track.id.clone(), frames, self.playback.clone());
                let handle = self.consumers.spawn(consumer.run(token.clone()));
                self.task_tracks.insert(handle.id(), track.id.clone());
                self.active.insert(track.id.clone(), token);
                info!("Subscribed to remote audio track {}", track.id);
            }
            kind => {
                self.health.record_video_track_ignored();
                info!("Ignoring remote {} track {}", kind, track.id);
            }
        }
    }

    fn reap(&mut self, finished: Result<(Id, String), JoinError>) {
        let id = match finished {
            Ok((id, _track)) => id,
            Err(e) => {
                if e.is_panic() {
                    error!("Remote audio consumer panicked: {}", e);
                }
                e.id()
            }
        };
        if let Some(track_id) = self.task_tracks.remove(&id) {
            self.active.remove(&track_id);
        }
    }

    /// Dispatch one event. Returns `false` once the session is gone.
    fn on_event(&mut self, event: Option<SessionEvent>, cancel: &CancellationToken) -> bool {
        match event {
            Some(SessionEvent::TrackAvailable(track)) => self.on_track(track, cancel),
            Some(SessionEvent::TrackEnded { track_id }) => {
                if let Some(token) = self.active.get(&track_id) {
                    token.cancel();
                }
                info!("Remote track {} ended", track_id);
            }
            Some(SessionEvent::ParticipantConnected { identity }) => {
                info!("Participant connected: {}", identity);
            }
            Some(SessionEvent::ParticipantDisconnected { identity }) => {
                info!("Participant disconnected: {}", identity);
            }
            Some(SessionEvent::Disconnected) | None => {
                warn!("Remote session disconnected, remote audio stops; video keeps streaming");
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl PipelineStage for TrackRouter {
    async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(finished) = self.consumers.join_next_with_id() => self.reap(finished),
                event = self.events.recv() => {
                    if !self.on_event(event, &cancel) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "track-router"
    }

    /// Cancel every consumer and wait for them to finish.
    async fn shutdown(&mut self) -> Result<()> {
        for token in self.active.values() {
            token.cancel();
        }
        self.consumers.abort_all();
        while let Some(finished) = self.consumers.join_next_with_id().await {
            self.reap(finished);
        }
        self.events.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::spawn_stage;
    use crate::transport::AudioFrames;
    use std::time::Duration;
    use tokio_stream::wrappers::ReceiverStream;

    fn chunk(sequence: u64) -> AudioChunk {
        AudioChunk::new(vec![1; 480], 48_000, 1, sequence)
    }

    fn live_track(id: &str) -> (RemoteTrack, mpsc::Sender<AudioChunk>) {
        let (tx, rx) = mpsc::channel(8);
        let frames: AudioFrames = Box::pin(ReceiverStream::new(rx));
        (RemoteTrack::audio(id, frames), tx)
    }

    struct Harness {
        events: mpsc::Sender<SessionEvent>,
        played: mpsc::Receiver<AudioChunk>,
        health: Arc<PipelineHealth>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<TrackRouter>,
    }

    fn start() -> Harness {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (play_tx, play_rx) = mpsc::channel(32);
        let health = Arc::new(PipelineHealth::new());
        let cancel = CancellationToken::new();
        let router = TrackRouter::new(events_rx, play_tx, health.clone());
        Harness {
            events: events_tx,
            played: play_rx,
            health,
            handle: spawn_stage(router, cancel.clone()),
            cancel,
        }
    }

    #[tokio::test]
    async fn test_audio_is_played_and_video_ignored() {
        let mut h = start();
        let (track, audio) = live_track("mic");
        h.events.send(SessionEvent::TrackAvailable(track)).await.unwrap();
        h.events.send(SessionEvent::TrackAvailable(RemoteTrack::video("cam"))).await.unwrap();

        for seq in 0..3 {
            audio.send(chunk(seq)).await.unwrap();
        }
        for expected in 0..3 {
            assert_eq!(h.played.recv().await.map(|c| c.sequence), Some(expected));
        }

        h.events.send(SessionEvent::Disconnected).await.unwrap();
        let router = h.handle.await.unwrap();
        assert_eq!(router.active_tracks(), 0);
        assert_eq!(h.health.summary().video_tracks_ignored, 1);
    }

    #[tokio::test]
    async fn test_duplicate_track_gets_single_consumer() {
        let mut h = start();
        let (first, audio) = live_track("a");
        let (second, _unused) = live_track("a");
        h.events.send(SessionEvent::TrackAvailable(first)).await.unwrap();
        h.events.send(SessionEvent::TrackAvailable(second)).await.unwrap();

        audio.send(chunk(0)).await.unwrap();
        assert_eq!(h.played.recv().await.map(|c| c.sequence), Some(0));

        h.cancel.cancel();
        let router = h.handle.await.unwrap();
        assert_eq!(router.active_tracks(), 0);
    }

    #[tokio::test]
    async fn test_track_end_releases_slot() {
        let h = start();
        let (track, audio) = live_track("t1");
        h.events.send(SessionEvent::TrackAvailable(track)).await.unwrap();
        h.events
            .send(SessionEvent::ParticipantConnected { identity: "operator".into() })
            .await
            .unwrap();
        drop(audio);

        // a track that ended can be re-published under the same id
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (again, audio) = live_track("t1");
        h.events.send(SessionEvent::TrackAvailable(again)).await.unwrap();
        h.events.send(SessionEvent::TrackEnded { track_id: "t1".into() }).await.unwrap();

        drop(h.events);
        let router = h.handle.await.unwrap();
        assert_eq!(router.active_tracks(), 0);
        drop(audio);
    }
}
