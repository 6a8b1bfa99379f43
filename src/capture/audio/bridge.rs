use crate::pipeline::health::PipelineHealth;
use crate::pipeline::queue::{AudioQueueProducer, PushOutcome};
use crate::pipeline::types::AudioChunk;
use std::sync::Arc;

/// Runs inside the audio driver callback.
///
/// Copies each block into a chunk and enqueues it without blocking. A full
/// queue drops the new chunk and bumps a counter; nothing is logged here.
pub struct MicBridge {
    producer: AudioQueueProducer,
    sample_rate: u32,
    channels: u16,
    sequence: u64,
    health: Arc<PipelineHealth>,
}

impl MicBridge {
    pub fn new(
        producer: AudioQueueProducer,
        sample_rate: u32,
        channels: u16,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            producer,
            sample_rate,
            channels,
            sequence: 0,
            health,
        }
    }

    pub fn on_block(&mut self, samples: &[i16]) -> PushOutcome {
        let chunk = AudioChunk::new(samples.to_vec(), self.sample_rate, self.channels, self.sequence);
        // dropped chunks still consume a sequence number
        self.sequence += 1;

        let outcome = self.producer.try_push(chunk);
        if outcome == PushOutcome::Dropped {
            self.health.record_mic_drop();
        }
        outcome
    }
}
