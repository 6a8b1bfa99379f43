use crate::assets::RPICAM_PROGRAM;
use crate::capture::{CameraDevice, PixelLayout, RawFrame, ReadInterrupt};
use crate::error::{DeviceError, FrameReadError};
use bytes::Bytes;
use log::{info, warn};
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

/// Camera backed by an `rpicam-vid` child process streaming raw I420 frames
/// on stdout. The child is killed when the camera is closed or dropped.
pub struct RpicamCamera {
    id: u32,
    width: u32,
    height: u32,
    frame_size: usize,
    child: Arc<Mutex<Option<Child>>>,
    stdout: Option<ChildStdout>,
}

impl RpicamCamera {
    pub fn open(id: u32, width: u32, height: u32, frame_rate: u32) -> Result<Self, DeviceError> {
        let mut command = Command::new(RPICAM_PROGRAM);
        command.args(Self::args(id, width, height, frame_rate));
        let camera = Self::spawn(command, id, width, height)?;

        info!("Camera {}: {}x{} @ {}fps (I420 via {})", id, width, height, frame_rate, RPICAM_PROGRAM);
        Ok(camera)
    }

    fn spawn(mut command: Command, id: u32, width: u32, height: u32) -> Result<Self, DeviceError> {
        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DeviceError::Spawn { program, source })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeviceError::Unavailable {
                name: format!("rpicam:{id}"),
                reason: "child stdout was not captured".to_string(),
            });
        };

        Ok(Self {
            id,
            width,
            height,
            frame_size: PixelLayout::I420.frame_size(width, height),
            child: Arc::new(Mutex::new(Some(child))),
            stdout: Some(stdout),
        })
    }

    fn args(id: u32, width: u32, height: u32, frame_rate: u32) -> Vec<String> {
        let mut args: Vec<String> = vec!["--camera".into(), id.to_string()];
        args.extend(["-t", "0", "-n"].map(String::from));
        args.extend(["--width".into(), width.to_string(), "--height".into(), height.to_string()]);
        args.extend(["--framerate".into(), frame_rate.to_string()]);
        args.extend(["--codec", "yuv420", "--low-latency", "-o", "-"].map(String::from));
        args
    }
}

/// Fill `buf` completely, or report how much arrived before end of stream.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), FrameReadError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FrameReadError::Short {
                    expected: buf.len(),
                    got: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl CameraDevice for RpicamCamera {
    fn label(&self) -> String {
        format!("rpicam:{}", self.id)
    }

    fn read_frame(&mut self) -> Result<RawFrame, FrameReadError> {
        let stdout = self.stdout.as_mut().ok_or(FrameReadError::Short {
            expected: self.frame_size,
            got: 0,
        })?;

        let mut buf = vec![0u8; self.frame_size];
        read_full(stdout, &mut buf)?;

        Ok(RawFrame::new(Bytes::from(buf), self.width, self.height, PixelLayout::I420))
    }

    fn close(&mut self) {
        self.stdout.take();
        let child = match self.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut child) = child {
            if let Err(e) = child.kill() {
                warn!("rpicam:{}: kill failed: {}", self.id, e);
            }
            let _ = child.wait();
        }
    }

    /// Killing the child ends its stdout, so a blocked read returns short.
    fn read_interrupt(&self) -> Option<ReadInterrupt> {
        let child = self.child.clone();
        let id = self.id;
        Some(Arc::new(move || {
            let Ok(mut guard) = child.lock() else {
                return;
            };
            if let Some(child) = guard.as_mut() {
                if let Err(e) = child.kill() {
                    warn!("rpicam:{}: interrupt failed: {}", id, e);
                }
            }
        }))
    }
}

impl Drop for RpicamCamera {
    fn drop(&mut self) {
        self.close();
    }
}
