//! Boundary to the remote media session.
//!
//! The session itself (signalling, encoding, network) lives outside this
//! crate. The pipeline only sees the sinks and the inbound event stream
//! defined here.

pub mod loopback;
pub mod video;

use crate::error::SendError;
use crate::pipeline::types::{AudioChunk, OutputLayout, StereoFrame, TrackKind};
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

pub use video::{ChannelVideoSink, CountingVideoSink, NullAudioSink};

/// Outbound video. One composed frame per pacing iteration.
pub trait VideoSink: Send {
    /// Pixel layout the sink wants frames in.
    fn required_layout(&self) -> OutputLayout {
        OutputLayout::Rgba32
    }

    /// Hand over one frame. Must not block for longer than a frame period.
    fn publish(&mut self, frame: StereoFrame);

    fn close(&mut self);
}

/// Outbound audio.
#[async_trait]
pub trait AudioSink: Send {
    async fn send(&mut self, chunk: AudioChunk) -> Result<(), SendError>;

    async fn close(&mut self) {}
}

/// Lazy, non-restartable sequence of chunks from one remote audio track.
/// Ends when the track ends or the session goes away.
pub type AudioFrames = Pin<Box<dyn Stream<Item = AudioChunk> + Send>>;

/// A track published by the remote participant.
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    /// Present for audio tracks only.
    pub frames: Option<AudioFrames>,
}

impl RemoteTrack {
    pub fn audio(id: impl Into<String>, frames: AudioFrames) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Audio,
            frames: Some(frames),
        }
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Video,
            frames: None,
        }
    }
}

impl std::fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Inbound session events, in delivery order.
#[derive(Debug)]
pub enum SessionEvent {
    TrackAvailable(RemoteTrack),
    TrackEnded { track_id: String },
    ParticipantConnected { identity: String },
    ParticipantDisconnected { identity: String },
    Disconnected,
}

/// Receiving end of the inbound session.
pub type SessionEvents = tokio::sync::mpsc::Receiver<SessionEvent>;
