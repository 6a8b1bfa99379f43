//! Simple sinks for local runs

use crate::error::SendError;
use crate::pipeline::types::{AudioChunk, OutputLayout, StereoFrame};
use crate::transport::{AudioSink, VideoSink};
use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::mpsc;

/// Counts published frames and throws them away.
pub struct CountingVideoSink {
    layout: OutputLayout,
    published: u64,
    bytes: u64,
}

impl CountingVideoSink {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            published: 0,
            bytes: 0,
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl VideoSink for CountingVideoSink {
    fn required_layout(&self) -> OutputLayout {
        self.layout
    }

    fn publish(&mut self, frame: StereoFrame) {
        self.published += 1;
        self.bytes += frame.size() as u64;
    }

    fn close(&mut self) {
        info!(
            "Video sink closed: {} frames, {} MiB",
            self.published,
            self.bytes / (1024 * 1024)
        );
    }
}

/// Forwards frames to a bounded channel without waiting. If the consumer is
/// behind, the frame is dropped.
pub struct ChannelVideoSink {
    tx: Option<mpsc::Sender<StereoFrame>>,
    layout: OutputLayout,
    dropped: u64,
}

impl ChannelVideoSink {
    pub fn new(capacity: usize, layout: OutputLayout) -> (Self, mpsc::Receiver<StereoFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(tx),
                layout,
                dropped: 0,
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl VideoSink for ChannelVideoSink {
    fn required_layout(&self) -> OutputLayout {
        self.layout
    }

    fn publish(&mut self, frame: StereoFrame) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.try_send(frame).is_err() {
            self.dropped += 1;
            debug!("Video consumer behind, frame dropped");
        }
    }

    fn close(&mut self) {
        // dropping the sender ends the receiver's stream
        self.tx.take();
    }
}

/// Accepts and discards outbound audio when no remote session is attached.
#[derive(Default)]
pub struct NullAudioSink {
    sent: u64,
}

#[async_trait]
impl AudioSink for NullAudioSink {
    async fn send(&mut self, _chunk: AudioChunk) -> Result<(), SendError> {
        self.sent += 1;
        Ok(())
    }

    async fn close(&mut self) {
        debug!("Null audio sink closed after {} chunks", self.sent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(sequence: u64) -> StereoFrame {
        StereoFrame {
            data: Bytes::from_static(&[0; 8]),
            width: 2,
            height: 1,
            layout: OutputLayout::Rgba32,
            sequence,
            captured_at: std::time::Instant::now(),
        }
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (mut sink, mut rx) = ChannelVideoSink::new(2, OutputLayout::Rgba32);
        for seq in 0..4 {
            sink.publish(frame(seq));
        }
        assert_eq!(sink.dropped(), 2);
        assert_eq!(rx.try_recv().map(|f| f.sequence).ok(), Some(0));
        assert_eq!(rx.try_recv().map(|f| f.sequence).ok(), Some(1));
    }

    #[tokio::test]
    async fn test_channel_sink_close_ends_stream() {
        let (mut sink, mut rx) = ChannelVideoSink::new(2, OutputLayout::Rgb24);
        sink.publish(frame(0));
        sink.close();
        sink.publish(frame(1));

        assert_eq!(rx.recv().await.map(|f| f.sequence), Some(0));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_counting_sink() {
        let mut sink = CountingVideoSink::new(OutputLayout::Rgba32);
        sink.publish(frame(0));
        sink.publish(frame(1));
        assert_eq!(sink.published(), 2);
        assert_eq!(sink.required_layout(), OutputLayout::Rgba32);
    }
}
