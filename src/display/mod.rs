//! Local output of remote media

pub mod audio_buffer;
pub mod playback;
#[cfg(feature = "cpal")]
pub mod speaker;

pub use audio_buffer::SampleRing;
pub use playback::{PlaybackDevice, PlaybackWriter, open_playback};
#[cfg(feature = "cpal")]
pub use speaker::CpalPlayback;
