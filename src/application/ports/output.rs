//! Audio output port interfaces

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

/// Playback errors
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("Recording not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Audio output unavailable: {0}")]
    PlaybackDeviceError(String),
}

/// A running output. Holds the output device until halted.
pub trait OutputStream: Send {
    /// Stop sound and release the device. Must not block an async caller
    /// on device teardown. Calling it again does nothing.
    fn halt(&mut self);
}

/// An opened output plus the signal for its natural end.
pub struct OutputSession {
    pub stream: Box<dyn OutputStream>,
    /// Resolves once the source is exhausted, or with an error if playback broke
    pub ended: oneshot::Receiver<Result<(), PlaybackError>>,
}

/// Port for the speaker.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Start playing the file at `path`
    async fn open(&self, path: &Path) -> Result<OutputSession, PlaybackError>;
}
