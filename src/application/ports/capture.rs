//! Audio capture port interfaces

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioFormat;

/// Capture device errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Failed to open capture device: {0}")]
    OpenFailed(String),

    #[error("Failed to write audio: {0}")]
    WriteFailed(String),

    #[error("Failed to finalize recording: {0}")]
    FinalizeFailed(String),
}

/// What a finished capture wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSummary {
    pub samples: u64,
}

/// Port for the microphone.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Open the device and start writing `format` audio to `path`.
    ///
    /// On error nothing is left open and no file is left at `path`.
    async fn open(
        &self,
        path: &Path,
        format: AudioFormat,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// An open capture. Dropping it without `finish` releases the device and
/// abandons the file.
#[async_trait]
pub trait CaptureStream: Send {
    /// Close the device, then flush and close the file.
    ///
    /// The device is closed even when finalizing the file fails.
    async fn finish(self: Box<Self>) -> Result<CaptureSummary, CaptureError>;
}
