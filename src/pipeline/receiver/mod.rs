//! Inbound side of the session
//!
//! ```text
//! SessionEvents → TrackRouter ─┬→ RemoteAudioConsumer (per audio track) → PlaybackWriter
//!                              └→ video: logged and dropped
//! ```

pub mod consumer;
pub mod router;

pub use consumer::RemoteAudioConsumer;
pub use router::TrackRouter;
