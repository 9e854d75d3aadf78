//! Rodio-based audio output adapter
//!
//! `rodio::OutputStream` must stay on the thread that created it, so each
//! playback runs on its own thread and is halted through a channel.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream as RodioOutputStream, Sink};
use tokio::sync::oneshot;
use tracing::debug;

use crate::application::ports::{AudioOutput, OutputSession, OutputStream, PlaybackError};

/// How often the playback thread checks for the end of the source
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Audio output on the default rodio device
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioAudioOutput;

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    async fn open(&self, path: &Path) -> Result<OutputSession, PlaybackError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (ended_tx, ended_rx) = oneshot::channel();
        let (halt_tx, halt_rx) = mpsc::channel();

        let path = path.to_path_buf();
        let thread = std::thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || run_playback(path, halt_rx, ready_tx, ended_tx))
            .map_err(|e| {
                PlaybackError::PlaybackDeviceError(format!("Failed to spawn playback thread: {}", e))
            })?;

        let ready = ready_rx.await.unwrap_or_else(|_| {
            Err(PlaybackError::PlaybackDeviceError(
                "Playback thread exited during startup".to_string(),
            ))
        });
        if let Err(e) = ready {
            let _ = thread.join();
            return Err(e);
        }

        Ok(OutputSession {
            stream: Box::new(RodioStream {
                halt_tx: Some(halt_tx),
                thread: Some(thread),
            }),
            ended: ended_rx,
        })
    }
}

/// A playback thread that holds the output device
pub struct RodioStream {
    halt_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputStream for RodioStream {
    /// Silences the sink right away. Inside a runtime the thread is joined
    /// on the blocking pool so async callers never wait on device teardown.
    fn halt(&mut self) {
        if let Some(tx) = self.halt_tx.take() {
            let _ = tx.send(());
        }
        let Some(thread) = self.thread.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    let _ = thread.join();
                });
            }
            Err(_) => {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for RodioStream {
    fn drop(&mut self) {
        self.halt();
    }
}

fn open_sink(path: &Path) -> Result<(RodioOutputStream, Sink), PlaybackError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PlaybackError::FileNotFound(path.to_path_buf()),
        _ => PlaybackError::PlaybackDeviceError(format!("Failed to open recording: {}", e)),
    })?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| PlaybackError::PlaybackDeviceError(format!("Failed to decode: {}", e)))?;

    let (stream, handle) = RodioOutputStream::try_default()
        .map_err(|e| PlaybackError::PlaybackDeviceError(e.to_string()))?;
    let sink = Sink::try_new(&handle).map_err(|e| PlaybackError::PlaybackDeviceError(e.to_string()))?;
    sink.append(source);

    Ok((stream, sink))
}

fn run_playback(
    path: PathBuf,
    halt: Receiver<()>,
    ready: oneshot::Sender<Result<(), PlaybackError>>,
    ended: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let (stream, sink) = match open_sink(&path) {
        Ok(parts) => parts,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    debug!(path = %path.display(), "output opened");

    while !sink.empty() {
        match halt.recv_timeout(POLL_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                sink.stop();
                debug!(path = %path.display(), "output halted");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    // Release the device before reporting the end
    drop(sink);
    drop(stream);
    let _ = ended.send(Ok(()));
}
