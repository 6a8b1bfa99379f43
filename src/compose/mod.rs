//! Stereo frame composition
//!
//! Turns two eye frames into one side-by-side frame in the layout the video
//! sink expects.

mod stereo;
mod yuv;

use serde::{Deserialize, Serialize};

pub use stereo::{ComposeOpts, FrameComposer};
pub use yuv::i420_to_rgb;

/// Byte order of the three colour channels a camera delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}
