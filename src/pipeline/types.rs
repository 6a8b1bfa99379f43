//! Core types for the pipeline system

use bytes::Bytes;
use std::time::{Duration, Instant};

/// Pixel layout a video sink expects for composed frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    Rgb24,
    /// RGB plus a fully opaque alpha channel.
    Rgba32,
}

impl OutputLayout {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            OutputLayout::Rgb24 => 3,
            OutputLayout::Rgba32 => 4,
        }
    }
}

/// Left and right eye side by side, ready for the outbound video sink.
///
/// Created once per pacing iteration and handed to the sink by value.
#[derive(Clone)]
pub struct StereoFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub layout: OutputLayout,
    /// Position in publish order, starting at 0.
    pub sequence: u64,
    /// Capture time of the left eye.
    pub captured_at: Instant,
}

impl StereoFrame {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for StereoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StereoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("sequence", &self.sequence)
            .field("size", &self.size())
            .finish()
    }
}

/// A block of interleaved signed 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Increases by one per produced chunk, dropped chunks included.
    pub sequence: u64,
}

impl AudioChunk {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16, sequence: u64) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            sequence,
        }
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.frames() as u64 * 1_000_000_000 / self.sample_rate.max(1) as u64)
    }
}

/// Kind of an inbound media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Other,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "Audio"),
            TrackKind::Video => write!(f, "Video"),
            TrackKind::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_frames_and_duration() {
        let chunk = AudioChunk::new(vec![0; 960], 48_000, 2, 0);
        assert_eq!(chunk.frames(), 480);
        assert_eq!(chunk.duration(), Duration::from_millis(10));
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(OutputLayout::Rgb24.bytes_per_pixel(), 3);
        assert_eq!(OutputLayout::Rgba32.bytes_per_pixel(), 4);
    }
}
