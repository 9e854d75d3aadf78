//! Command runners for record, play and list

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration as StdDuration, SystemTime};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::application::ports::{AudioFileStore, ConfigStore, StoreError};
use crate::application::{CaptureLock, PlaybackController, RecordingSessionManager};
use crate::domain::config::AppConfig;
use crate::domain::playback::PlaybackState;
use crate::domain::recording::{AudioFormat, Duration, RecordedFile};
use crate::infrastructure::{
    CpalCaptureDevice, CpalPermissionGate, LocalAudioFileStore, RodioAudioOutput, XdgConfigStore,
};

use super::presenter::{format_elapsed, Presenter};
use super::signals::StopSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How often the recording spinner refreshes
const PROGRESS_INTERVAL: StdDuration = StdDuration::from_millis(250);

/// Load and merge configuration: defaults < file < env < cli.
///
/// `VOICE_MEMO_DIR` reaches us through clap's `env` support, so it arrives
/// inside `cli_config` together with `--storage-dir`.
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config file");
        AppConfig::empty()
    });

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Open the recording store described by `config`
pub fn open_store(config: &AppConfig) -> Result<LocalAudioFileStore, StoreError> {
    let root = config
        .storage_dir()
        .unwrap_or_else(LocalAudioFileStore::default_root);
    LocalAudioFileStore::open(root, config.file_stem_or_default(), config.naming_or_default())
}

/// Record one memo. Stops on Ctrl+C or once `limit` has elapsed.
pub async fn run_record(config: &AppConfig, requested: Option<Duration>) -> ExitCode {
    let mut presenter = Presenter::new();

    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let stop = StopSignal::new();
    if let Err(e) = stop.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let max = config.max_duration_or_default();
    let limit = requested.map_or(max, |d| d.min(max));
    debug!(%limit, "recording limit");

    let manager = RecordingSessionManager::new(
        CpalPermissionGate::new(),
        store,
        CpalCaptureDevice::new(),
        CaptureLock::global(),
    );

    presenter.start_spinner("Requesting microphone access...");
    let started = tokio::select! {
        result = manager.start() => result,
        _ = stop.requested() => {
            presenter.spinner_fail("Cancelled");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Err(e) = started {
        presenter.spinner_fail(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    let begun = tokio::time::Instant::now();
    let deadline = tokio::time::sleep(limit.as_std());
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);

    loop {
        tokio::select! {
            _ = stop.requested() => break,
            _ = &mut deadline => {
                debug!("recording limit reached");
                break;
            }
            _ = ticker.tick() => {
                presenter.update_recording_progress(begun.elapsed(), limit.as_std());
            }
        }
    }

    match manager.stop().await {
        Ok(file) => {
            presenter.spinner_success(&format!(
                "Recorded {} ({})",
                file.display_name(),
                format_elapsed(file.duration())
            ));
            presenter.output(&file.path().to_string_lossy());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Play `name`, or the most recent recording, until it ends or Ctrl+C.
pub async fn run_play(config: &AppConfig, name: Option<String>) -> ExitCode {
    let mut presenter = Presenter::new();

    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let path = match name {
        Some(name) => named_recording(&store, &name),
        None => match store.latest() {
            Ok(Some(path)) => path,
            Ok(None) => {
                presenter.error(&format!("No recordings in {}", store.root().display()));
                return ExitCode::from(EXIT_ERROR);
            }
            Err(e) => {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };
    let file = describe_recording(&path);

    let stop = StopSignal::new();
    if let Err(e) = stop.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let controller = PlaybackController::new(store, RodioAudioOutput::new());
    let handle = match controller.play(&file).await {
        Ok(handle) => handle,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.start_spinner(&format!(
        "Playing {} ({}) - Ctrl+C to stop",
        file.display_name(),
        format_elapsed(file.duration())
    ));
    let finished = tokio::select! {
        state = handle.wait() => state,
        _ = stop.requested() => {
            handle.stop();
            handle.state()
        }
    };

    match finished {
        PlaybackState::Failed => {
            presenter.spinner_fail("Playback failed");
            ExitCode::from(EXIT_ERROR)
        }
        PlaybackState::Stopped => {
            presenter.stop_spinner();
            presenter.info("Playback stopped");
            ExitCode::from(EXIT_SUCCESS)
        }
        _ => {
            presenter.spinner_success(&format!("Played {}", file.display_name()));
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}

/// Path for a recording named on the command line. Names the store does
/// not know are kept as given so playback reports them as missing.
fn named_recording(store: &impl AudioFileStore, name: &str) -> PathBuf {
    store
        .resolve(name)
        .unwrap_or_else(|| store.root().join(name))
}

/// Print every recording with its length and modification time.
pub fn run_list(config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let recordings = match store.list() {
        Ok(recordings) => recordings,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if recordings.is_empty() {
        presenter.info(&format!("No recordings in {}", store.root().display()));
        return ExitCode::from(EXIT_SUCCESS);
    }

    for path in recordings {
        let file = describe_recording(&path);
        let length = (file.sample_count() > 0).then(|| file.duration());
        presenter.recording_row(
            &file.display_name(),
            length,
            &file.created_at().format("%Y-%m-%d %H:%M").to_string(),
        );
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Rebuild a descriptor for a file on disk from its WAV header and mtime.
/// Unreadable headers give a zero-length descriptor.
fn describe_recording(path: &Path) -> RecordedFile {
    let created_at: DateTime<Local> = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .into();

    match hound::WavReader::open(path) {
        Ok(reader) if AudioFormat::STANDARD.matches(&reader.spec()) => RecordedFile::new(
            PathBuf::from(path),
            AudioFormat::STANDARD,
            created_at,
            u64::from(reader.duration()),
        ),
        _ => RecordedFile::existing(path, created_at),
    }
}
