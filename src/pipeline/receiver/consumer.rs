use crate::assets::REMOTE_AUDIO_LOG_EVERY;
use crate::pipeline::types::AudioChunk;
use crate::transport::AudioFrames;
use futures_util::StreamExt;
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Plays one remote audio track by handing its chunks to the playback writer.
pub struct RemoteAudioConsumer {
    track_id: String,
    frames: AudioFrames,
    playback: mpsc::Sender<AudioChunk>,
    received: u64,
}

impl RemoteAudioConsumer {
    pub fn new(track_id: String, frames: AudioFrames, playback: mpsc::Sender<AudioChunk>) -> Self {
        Self {
            track_id,
            frames,
            playback,
            received: 0,
        }
    }

    /// Iterate the track until it ends or `cancel` fires. Returns the track id.
    pub async fn run(mut self, cancel: CancellationToken) -> String {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.frames.next() => next,
            };
            let Some(chunk) = next else {
                info!("Remote audio track {} ended after {} frames", self.track_id, self.received);
                break;
            };

            self.received += 1;
            if self.received == 1 {
                info!(
                    "First remote audio frame on {}: {} samples @ {} Hz, {} ch",
                    self.track_id,
                    chunk.samples.len(),
                    chunk.sample_rate,
                    chunk.channels
                );
            } else if self.received % REMOTE_AUDIO_LOG_EVERY == 0 {
                info!("Remote audio {}: {} frames", self.track_id, self.received);
            }

            let delivered = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.playback.send(chunk) => res,
            };
            if delivered.is_err() {
                warn!("Playback writer gone, stopping remote audio {}", self.track_id);
                break;
            }
        }
        self.track_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(n: u64) -> AudioFrames {
        Box::pin(futures_util::stream::iter(
            (0..n).map(|seq| AudioChunk::new(vec![seq as i16; 4], 48_000, 1, seq)),
        ))
    }

    #[tokio::test]
    async fn test_forwards_in_stream_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let consumer = RemoteAudioConsumer::new("a1".into(), chunks(5), tx);

        let id = consumer.run(CancellationToken::new()).await;
        assert_eq!(id, "a1");

        let mut got = Vec::new();
        while let Some(c) = rx.recv().await {
            got.push(c.sequence);
        }
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_cancel_stops_pending_stream() {
        let (tx, _rx) = mpsc::channel(4);
        let pending: AudioFrames = Box::pin(futures_util::stream::pending::<AudioChunk>());
        let consumer = RemoteAudioConsumer::new("a2".into(), pending, tx);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(consumer.run(cancel).await, "a2");
    }

    #[tokio::test]
    async fn test_stops_when_playback_gone() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let consumer = RemoteAudioConsumer::new("a3".into(), chunks(3), tx);
        assert_eq!(consumer.run(CancellationToken::new()).await, "a3");
    }
}
