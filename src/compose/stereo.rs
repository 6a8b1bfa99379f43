use crate::assets::OPAQUE;
use crate::capture::{PixelLayout, RawFrame};
use crate::compose::{ChannelOrder, i420_to_rgb};
use crate::config::Config;
use crate::pipeline::types::{OutputLayout, StereoFrame};
use bytes::Bytes;

/// How eye frames are corrected before stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOpts {
    /// Channel order of packed camera frames. Planar frames always decode to RGB.
    pub channel_order: ChannelOrder,
    /// Cameras are mounted upside down.
    pub mount_inverted: bool,
    pub output: OutputLayout,
}

impl ComposeOpts {
    pub fn from_config(config: &Config, output: OutputLayout) -> Self {
        Self {
            channel_order: config.channel_order,
            mount_inverted: config.mount_inverted,
            output,
        }
    }
}

/// Builds side-by-side stereo frames. Stateless apart from its options.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    opts: ComposeOpts,
}

impl FrameComposer {
    pub fn new(opts: ComposeOpts) -> Self {
        Self { opts }
    }

    pub fn opts(&self) -> &ComposeOpts {
        &self.opts
    }

    /// Compose one stereo frame, left eye first.
    ///
    /// Per eye: channel reorder, then 180° rotation if the mount is inverted.
    /// Then both eyes are stitched row by row and widened to the output layout.
    ///
    /// # Panics
    ///
    /// If the eyes differ in size or a buffer is shorter than its layout needs.
    pub fn compose(&self, left: &RawFrame, right: &RawFrame, sequence: u64) -> StereoFrame {
        assert_eq!(
            (left.width, left.height),
            (right.width, right.height),
            "eye frames must have identical dimensions"
        );

        let left_rgb = self.correct_eye(left);
        let right_rgb = self.correct_eye(right);
        let data = stitch(&left_rgb, &right_rgb, left.width, left.height, self.opts.output);

        StereoFrame {
            data: Bytes::from(data),
            width: left.width * 2,
            height: left.height,
            layout: self.opts.output,
            sequence,
            captured_at: left.captured_at,
        }
    }

    /// Packed RGB, upright.
    fn correct_eye(&self, frame: &RawFrame) -> Vec<u8> {
        let needed = frame.layout.frame_size(frame.width, frame.height);
        assert!(frame.data.len() >= needed, "eye frame buffer too short");

        let mut rgb = match frame.layout {
            PixelLayout::Packed24 => {
                let mut px = frame.data[..needed].to_vec();
                if self.opts.channel_order == ChannelOrder::Bgr {
                    swap_red_blue(&mut px);
                }
                px
            }
            PixelLayout::I420 => i420_to_rgb(&frame.data[..needed], frame.width, frame.height),
        };

        if self.opts.mount_inverted {
            rotate_180(&mut rgb);
        }
        rgb
    }
}

fn swap_red_blue(px: &mut [u8]) {
    for p in px.chunks_exact_mut(3) {
        p.swap(0, 2);
    }
}

/// A 180° turn is the pixel sequence reversed.
fn rotate_180(px: &mut [u8]) {
    px.reverse();
    // reversing bytes also reversed the channels inside each pixel
    swap_red_blue(px);
}

fn stitch(left: &[u8], right: &[u8], width: u32, height: u32, output: OutputLayout) -> Vec<u8> {
    let row = width as usize * 3;
    let mut out = Vec::with_capacity(width as usize * 2 * height as usize * output.bytes_per_pixel());

    for y in 0..height as usize {
        for eye in [left, right] {
            let src = &eye[y * row..(y + 1) * row];
            match output {
                OutputLayout::Rgb24 => out.extend_from_slice(src),
                OutputLayout::Rgba32 => {
                    for p in src.chunks_exact(3) {
                        out.extend_from_slice(p);
                        out.push(OPAQUE);
                    }
                }
            }
        }
    }
    out
}
