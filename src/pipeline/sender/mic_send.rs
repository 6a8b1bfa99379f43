//! Microphone send stage
//!
//! Drains the microphone queue and forwards each chunk to the outbound
//! audio sink.

use crate::pipeline::health::PipelineHealth;
use crate::pipeline::queue::AudioQueueConsumer;
use crate::pipeline::stage::PipelineStage;
use crate::transport::AudioSink;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Waits on the queue with a bounded timeout so a cleared running flag is
/// noticed within one timeout even when no audio arrives.
pub struct MicSendStage {
    queue: AudioQueueConsumer,
    sink: Box<dyn AudioSink>,
    running: Arc<AtomicBool>,
    timeout: Duration,
    health: Arc<PipelineHealth>,
}

impl MicSendStage {
    pub fn new(
        queue: AudioQueueConsumer,
        sink: Box<dyn AudioSink>,
        running: Arc<AtomicBool>,
        timeout: Duration,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            queue,
            sink,
            running,
            timeout,
            health,
        }
    }
}

#[async_trait]
impl PipelineStage for MicSendStage {
    async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        while self.running.load(Ordering::Acquire) {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = tokio::time::timeout(self.timeout, self.queue.recv()) => next,
            };

            let chunk = match next {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    info!("Microphone queue closed");
                    break;
                }
                // nothing within the timeout, re-check the flag
                Err(_) => continue,
            };

            let sequence = chunk.sequence;
            // a chunk in flight at shutdown is lost
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = self.sink.send(chunk) => sent,
            };
            match sent {
                Ok(()) => self.health.record_mic_sent(),
                Err(e) => {
                    self.health.record_mic_send_failure();
                    warn!("Mic chunk {} not sent: {}", sequence, e);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mic-send"
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.queue.close();
        if !self.queue.is_empty() {
            let pending = self.queue.len();
            while self.queue.try_recv().is_some() {}
            debug!("Discarded {} queued microphone chunks", pending);
        }
        self.sink.close().await;
        Ok(())
    }
}
