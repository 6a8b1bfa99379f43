//! Bounded, lossy hand-off between the microphone driver thread and the
//! async send path.
//!
//! Single producer, single consumer. When the queue is full the incoming
//! chunk is dropped; queued chunks are never evicted.

use crate::pipeline::types::AudioChunk;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

/// Result of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue at capacity, the new chunk was discarded.
    Dropped,
    /// Consumer is gone.
    Closed,
}

/// Create a queue holding at most `capacity` chunks.
///
/// # Panics
///
/// If `capacity` is zero.
pub fn audio_queue(capacity: usize) -> (AudioQueueProducer, AudioQueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity);
    (AudioQueueProducer { tx }, AudioQueueConsumer { rx })
}

/// Producer half. Never blocks and never needs a runtime, so it is safe to
/// call from an audio driver callback.
pub struct AudioQueueProducer {
    tx: mpsc::Sender<AudioChunk>,
}

impl AudioQueueProducer {
    pub fn try_push(&self, chunk: AudioChunk) -> PushOutcome {
        match self.tx.try_send(chunk) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(_)) => PushOutcome::Dropped,
            Err(TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }
}

/// Consumer half, owned by the microphone send task.
pub struct AudioQueueConsumer {
    rx: mpsc::Receiver<AudioChunk>,
}

impl AudioQueueConsumer {
    /// Wait for the next chunk. `None` once the producer is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<AudioChunk> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AudioChunk> {
        match self.rx.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Refuse further pushes. Chunks already queued can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
