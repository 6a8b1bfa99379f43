use crate::capture::audio::default_microphone;
use crate::capture::{Eye, open_camera};
use crate::config::{CameraBackend, Config, app_name, version};
use crate::display::open_playback;
use crate::error::PipelineError;
use crate::pipeline::types::OutputLayout;
use crate::pipeline::{Session, SessionDevices};
use crate::transport::loopback::loopback;
use crate::transport::{AudioSink, CountingVideoSink, NullAudioSink, SessionEvents};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub mod assets;
pub mod capture;
pub mod compose;
pub mod config;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testing;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

fn cli() -> Command {
    Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file. Missing keys keep their defaults.")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("frames")
                .short('n')
                .long("frames")
                .value_name("N")
                .help("Stop after publishing N stereo frames.")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("camera")
                .long("camera")
                .value_name("BACKEND")
                .help("Camera backend (rpicam/test-pattern).")
                .ignore_case(true),
        )
        .arg(
            Arg::new("loopback")
                .long("loopback")
                .help("Play the microphone back through the local speaker via an in-process session.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-mic")
                .long("no-mic")
                .help("Do not capture the microphone.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("upright")
                .long("upright")
                .help("Cameras are mounted upright, skip the 180° correction.")
                .action(ArgAction::SetTrue),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(backend) = matches.get_one::<String>("camera") {
        config.camera_backend = backend.parse::<CameraBackend>()?;
    }
    if matches.get_flag("upright") {
        config.mount_inverted = false;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = cli().get_matches();

    let code = match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    };
    process::exit(code);
}

fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config = load_config(matches)?;
    let limit = matches.get_one::<u64>("frames").copied();

    let cancel = CancellationToken::new();
    let interrupted = Arc::new(AtomicBool::new(false));

    // gracefully stop the session when receiving SIGINT, SIGTERM, or SIGHUP
    ctrlc::set_handler({
        let cancel = cancel.clone();
        let interrupted = interrupted.clone();
        move || {
            interrupted.store(true, Ordering::SeqCst);
            cancel.cancel();
        }
    })
    .context("Error setting Ctrl-C handler")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(config.capture_workers)
        .thread_name("stereocast-capture")
        .build()
        .context("failed to build the async runtime")?;

    let result = runtime.block_on(stream(
        &config,
        cancel,
        limit,
        matches.get_flag("loopback"),
        !matches.get_flag("no-mic"),
    ));

    let was_interrupted = interrupted.load(Ordering::SeqCst);
    Ok(match result {
        Ok(frames) => {
            info!("Published {} stereo frames", frames);
            if was_interrupted { EXIT_INTERRUPTED } else { EXIT_OK }
        }
        Err(e) if was_interrupted => {
            warn!("Interrupted: {}", e);
            EXIT_INTERRUPTED
        }
        Err(e) => {
            if e.is_fatal_runtime() {
                error!("Streaming aborted: {}", e);
            } else {
                error!("Could not start streaming: {}", e);
            }
            EXIT_FAILURE
        }
    })
}

async fn stream(
    config: &Config,
    cancel: CancellationToken,
    limit: Option<u64>,
    use_loopback: bool,
    use_mic: bool,
) -> Result<u64, PipelineError> {
    let left_camera =
        open_camera(config, Eye::Left).map_err(|source| PipelineError::CameraOpen { eye: Eye::Left, source })?;
    let right_camera =
        open_camera(config, Eye::Right).map_err(|source| PipelineError::CameraOpen { eye: Eye::Right, source })?;

    let (audio_sink, inbound): (Box<dyn AudioSink>, Option<SessionEvents>) = if use_loopback {
        let (sink, events) = loopback(config.queue_capacity);
        (Box::new(sink), Some(events))
    } else {
        (Box::new(NullAudioSink::default()), None)
    };

    let devices = SessionDevices {
        left_camera,
        right_camera,
        video_sink: Box::new(CountingVideoSink::new(OutputLayout::Rgba32)),
        microphone: use_mic.then(|| default_microphone(config.sample_rate, config.channels, config.block_size)),
        audio_sink,
        inbound,
        playback: open_playback(config.sample_rate, config.channels),
    };

    let mut session = Session::start(config, devices, cancel)?;
    let result = session.run(limit).await;
    session.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let matches = cli()
            .try_get_matches_from(["stereocast", "--camera", "test-pattern", "--upright", "--frames", "12"])
            .unwrap();
        let config = load_config(&matches).unwrap();

        assert_eq!(config.camera_backend, CameraBackend::TestPattern);
        assert!(!config.mount_inverted);
        assert_eq!(matches.get_one::<u64>("frames").copied(), Some(12));
        assert!(!matches.get_flag("loopback"));
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let matches = cli().try_get_matches_from(["stereocast", "--camera", "webcam"]).unwrap();
        assert!(load_config(&matches).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let matches = cli()
            .try_get_matches_from(["stereocast", "--config", "/nonexistent/stereocast.json"])
            .unwrap();
        assert!(load_config(&matches).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_with_test_pattern() {
        let config = Config {
            eye_width: 32,
            eye_height: 16,
            frame_rate: 60,
            camera_backend: CameraBackend::TestPattern,
            ..Config::default()
        };
        let frames = stream(&config, CancellationToken::new(), Some(5), true, false)
            .await
            .unwrap();
        assert_eq!(frames, 5);
    }
}
