use crate::capture::{CameraDevice, PixelLayout, RawFrame};
use crate::error::FrameReadError;
use bytes::Bytes;
use std::time::Duration;

/// Synthetic camera producing a packed BGR gradient with a moving vertical bar.
///
/// Used for dry runs without camera hardware. `with_latency` makes every read
/// block for a fixed time, like a real sensor waiting for exposure.
pub struct TestPatternCamera {
    id: u32,
    width: u32,
    height: u32,
    frame_index: u64,
    latency: Option<Duration>,
}

impl TestPatternCamera {
    pub fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            frame_index: 0,
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar_x = (self.frame_index as usize * 8) % w.max(1);
        let tint = (self.id as u8).wrapping_mul(97);

        let mut buf = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                if x.abs_diff(bar_x) < 4 {
                    buf.extend_from_slice(&[255, 255, 255]);
                    continue;
                }
                // B, G, R
                buf.push(tint);
                buf.push((y * 255 / h.max(1)) as u8);
                buf.push((x * 255 / w.max(1)) as u8);
            }
        }
        buf
    }
}

impl CameraDevice for TestPatternCamera {
    fn label(&self) -> String {
        format!("pattern:{}", self.id)
    }

    fn read_frame(&mut self) -> Result<RawFrame, FrameReadError> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        let data = self.render();
        self.frame_index += 1;
        Ok(RawFrame::new(Bytes::from(data), self.width, self.height, PixelLayout::Packed24))
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_have_full_size() {
        let mut cam = TestPatternCamera::new(0, 32, 16);
        let frame = cam.read_frame().unwrap();
        assert_eq!(frame.data.len(), PixelLayout::Packed24.frame_size(32, 16));
        assert_eq!(frame.layout, PixelLayout::Packed24);
    }

    #[test]
    fn test_bar_moves_between_frames() {
        let mut cam = TestPatternCamera::new(1, 64, 4);
        let a = cam.read_frame().unwrap();
        let b = cam.read_frame().unwrap();
        assert_ne!(a.data, b.data);
    }
}
