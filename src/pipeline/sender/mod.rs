//! Outbound side of the session
//!
//! ```text
//! mic driver thread → MicBridge → audio queue → MicSendStage → AudioSink
//! ```
//!
//! Outbound video is driven by the pacing loop, see [`crate::pipeline::pacing`].

pub mod mic_send;

pub use mic_send::MicSendStage;
