// video
pub const FRAME_RATE: u32 = 30;
pub const EYE_WIDTH: u32 = 1920;
pub const EYE_HEIGHT: u32 = 1080;
pub const LEFT_CAMERA_ID: u32 = 0;
pub const RIGHT_CAMERA_ID: u32 = 1;
pub const CAPTURE_WORKERS: usize = 2;

// audio
pub const SAMPLE_RATE: u32 = 48_000;
pub const CHANNELS: u16 = 1;
/// 10 ms at 48 kHz.
pub const BLOCK_SIZE: u32 = 480;
pub const QUEUE_CAPACITY: usize = 50;
pub const SEND_TIMEOUT_MS: u64 = 100;
pub const PLAYBACK_QUEUE_CAPACITY: usize = 64;

// logging
pub const STATS_INTERVAL_SECS: u64 = 5;
pub const STREAM_LOG_SECONDS: u64 = 5;
pub const REMOTE_AUDIO_LOG_EVERY: u64 = 100;

/// Value of the alpha channel added for sinks that need RGBA.
pub const OPAQUE: u8 = 255;

pub const RPICAM_PROGRAM: &str = "rpicam-vid";
