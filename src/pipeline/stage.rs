//! Pipeline stage trait
//!
//! Event-driven parts of a session (microphone send, remote track routing,
//! playback) run as stages on the cooperative scheduler, each in its own task.

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A long-running unit of work that stops when its token is cancelled
#[async_trait]
pub trait PipelineStage: Send {
    /// Run the stage until cancellation or until its input ends
    async fn run(&mut self, cancel: CancellationToken) -> Result<()>;

    /// Get the name of this stage for logging
    fn name(&self) -> &'static str;

    /// Release whatever the stage owns. Called once after `run` returns.
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Spawn `stage` on the current runtime. The stage is handed back when it
/// finishes so the caller can inspect it.
pub fn spawn_stage<S>(mut stage: S, cancel: CancellationToken) -> JoinHandle<S>
where
    S: PipelineStage + 'static,
{
    tokio::spawn(async move {
        let name = stage.name();
        info!("{} stage started", name);
        if let Err(e) = stage.run(cancel).await {
            error!("{} stage failed: {:#}", name, e);
        }
        if let Err(e) = stage.shutdown().await {
            error!("{} stage shutdown failed: {:#}", name, e);
        }
        info!("{} stage finished", name);
        stage
    })
}
