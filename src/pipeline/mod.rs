//! Real-time media pipeline
//!
//! Three paths share one cooperative scheduler:
//! - Video: the pacing loop captures both eyes on the blocking pool,
//!   composes a side-by-side frame and publishes it once per period
//! - Microphone: the driver callback pushes into a bounded lossy queue,
//!   a send stage drains it into the outbound audio sink
//! - Remote audio: a router hands each inbound audio track to a consumer,
//!   which feeds the single playback writer
//!
//! # Architecture
//!
//! - Event-driven parts implement `PipelineStage` and run in their own task
//! - `Session` wires the paths and owns the shutdown order
//! - `PipelineHealth` counts what is dropped, sent and played

pub mod health;
pub mod pacing;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod stage;
pub mod state;
pub mod types;

pub use health::{HealthMonitor, PipelineHealth};
pub use pacing::{PacingDecision, PacingScheduler};
pub use queue::{AudioQueueConsumer, AudioQueueProducer, PushOutcome, audio_queue};
pub use session::{Session, SessionDevices};
pub use stage::PipelineStage;
pub use state::PacingPhase;
pub use types::{AudioChunk, OutputLayout, StereoFrame, TrackKind};
