//! Recorded file descriptor

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local};

use super::format::AudioFormat;

/// A finished recording on disk.
///
/// Only a recording session that stopped cleanly hands these out; callers
/// may also rebuild one for an existing file with [`RecordedFile::existing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    path: PathBuf,
    format: AudioFormat,
    created_at: DateTime<Local>,
    sample_count: u64,
}

impl RecordedFile {
    pub fn new(
        path: impl Into<PathBuf>,
        format: AudioFormat,
        created_at: DateTime<Local>,
        sample_count: u64,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            created_at,
            sample_count,
        }
    }

    /// Describe a file that already exists in the store, e.g. one picked from a listing.
    pub fn existing(path: impl Into<PathBuf>, created_at: DateTime<Local>) -> Self {
        Self::new(path, AudioFormat::STANDARD, created_at, 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Number of samples written when the file was finalized
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn duration(&self) -> StdDuration {
        self.format.duration_of(self.sample_count)
    }

    /// Human-readable name for display (the file name component)
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
