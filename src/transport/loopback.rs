//! In-process loopback session.
//!
//! Everything sent to the outbound audio sink comes back as a single remote
//! audio track, so the microphone path and the remote playback path can be
//! exercised end to end without a network.

use crate::error::SendError;
use crate::pipeline::types::AudioChunk;
use crate::transport::{AudioSink, RemoteTrack, SessionEvent, SessionEvents};
use async_trait::async_trait;
use log::info;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub const LOOPBACK_TRACK_ID: &str = "loopback-audio";
const LOOPBACK_IDENTITY: &str = "loopback";
const EVENT_CAPACITY: usize = 8;

/// Outbound half of the loopback.
pub struct LoopbackAudioSink {
    audio_tx: Option<mpsc::Sender<AudioChunk>>,
    events_tx: mpsc::Sender<SessionEvent>,
}

/// Build a loopback session whose remote track buffers up to `capacity` chunks.
pub fn loopback(capacity: usize) -> (LoopbackAudioSink, SessionEvents) {
    let (audio_tx, audio_rx) = mpsc::channel(capacity);
    let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);

    // the channel is fresh and larger than two, these cannot fail
    let _ = events_tx.try_send(SessionEvent::ParticipantConnected {
        identity: LOOPBACK_IDENTITY.to_string(),
    });
    let _ = events_tx.try_send(SessionEvent::TrackAvailable(RemoteTrack::audio(
        LOOPBACK_TRACK_ID,
        Box::pin(ReceiverStream::new(audio_rx)),
    )));

    (
        LoopbackAudioSink {
            audio_tx: Some(audio_tx),
            events_tx,
        },
        events_rx,
    )
}

#[async_trait]
impl AudioSink for LoopbackAudioSink {
    async fn send(&mut self, chunk: AudioChunk) -> Result<(), SendError> {
        let tx = self
            .audio_tx
            .as_ref()
            .ok_or_else(|| SendError("loopback closed".to_string()))?;
        tx.send(chunk)
            .await
            .map_err(|_| SendError("loopback track has no listener".to_string()))
    }

    async fn close(&mut self) {
        if self.audio_tx.take().is_none() {
            return;
        }
        let _ = self
            .events_tx
            .send(SessionEvent::TrackEnded {
                track_id: LOOPBACK_TRACK_ID.to_string(),
            })
            .await;
        let _ = self.events_tx.send(SessionEvent::Disconnected).await;
        info!("Loopback session closed");
    }
}
