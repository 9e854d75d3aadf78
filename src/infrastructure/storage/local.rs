//! Local directory store for recordings

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::application::ports::{AudioFileStore, StoreError};
use crate::domain::config::NamingPolicy;

/// File extension of every recording
pub const RECORDING_EXTENSION: &str = "wav";

/// Stores recordings as `<stem>[-n].wav` inside a private directory.
#[derive(Debug, Clone)]
pub struct LocalAudioFileStore {
    root: PathBuf,
    stem: String,
    policy: NamingPolicy,
}

impl LocalAudioFileStore {
    /// Open (and create if needed) the store rooted at `root`
    pub fn open(
        root: impl Into<PathBuf>,
        stem: impl Into<String>,
        policy: NamingPolicy,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        let unavailable = |e: std::io::Error| StoreError::Unavailable {
            path: root.clone(),
            message: e.to_string(),
        };

        fs::create_dir_all(&root).map_err(unavailable)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700)).map_err(unavailable)?;
        }

        debug!(root = %root.display(), ?policy, "opened recording store");
        Ok(Self {
            root,
            stem: stem.into(),
            policy,
        })
    }

    /// Per-user data directory for recordings
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join("voice-memo")
            .join("recordings")
    }

    pub fn policy(&self) -> NamingPolicy {
        self.policy
    }

    fn file_name(&self, index: u32) -> String {
        if index == 0 {
            format!("{}.{}", self.stem, RECORDING_EXTENSION)
        } else {
            format!("{}-{}.{}", self.stem, index, RECORDING_EXTENSION)
        }
    }

    /// A non-empty `.wav` file. Empty files are names reserved by
    /// [`allocate_path`](AudioFileStore::allocate_path) that were never written.
    fn is_recording(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == RECORDING_EXTENSION)
            && fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
    }

    /// Claim `candidate` by creating it empty; false when it is already taken
    fn reserve(candidate: &Path) -> Result<bool, StoreError> {
        match OpenOptions::new().write(true).create_new(true).open(candidate) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::Unavailable {
                path: candidate.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }
}

impl AudioFileStore for LocalAudioFileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn allocate_path(&self) -> Result<PathBuf, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable {
                path: self.root.clone(),
                message: "directory does not exist".to_string(),
            });
        }

        match self.policy {
            NamingPolicy::Overwrite => Ok(self.root.join(self.file_name(0))),
            NamingPolicy::Unique => {
                for index in 0..=u32::MAX {
                    let candidate = self.root.join(self.file_name(index));
                    if Self::reserve(&candidate)? {
                        debug!(path = %candidate.display(), "reserved recording name");
                        return Ok(candidate);
                    }
                }
                Err(StoreError::Unavailable {
                    path: self.root.clone(),
                    message: "no free file name left".to_string(),
                })
            }
        }
    }

    fn release(&self, path: &Path) {
        let unused = path.parent() == Some(self.root.as_path())
            && fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() == 0);
        if unused {
            let _ = fs::remove_file(path);
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path()) && Self::is_recording(path)
    }

    fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::ListFailed(e.to_string()))?;

        let mut recordings: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| Self::is_recording(path))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        recordings.sort();
        Ok(recordings.into_iter().map(|(_, path)| path).collect())
    }
}
