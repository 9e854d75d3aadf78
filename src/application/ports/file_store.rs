//! Recording storage port

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Recording directory unavailable at {path}: {message}")]
    Unavailable { path: PathBuf, message: String },

    #[error("Failed to list recordings: {0}")]
    ListFailed(String),
}

/// Port for naming recordings inside a private storage root.
///
/// Stores only manage paths; they never read or write audio data.
pub trait AudioFileStore: Send + Sync {
    /// The directory holding every recording
    fn root(&self) -> &Path;

    /// Path for a new recording, according to the store's naming policy.
    /// Unique names are claimed on allocation, so two stores sharing a
    /// root never hand out the same one.
    fn allocate_path(&self) -> Result<PathBuf, StoreError>;

    /// Give back an allocated path that never became a recording
    fn release(&self, _path: &Path) {}

    /// Whether `path` names an existing recording in this store
    fn exists(&self, path: &Path) -> bool;

    /// Existing recordings, oldest first
    fn list(&self) -> Result<Vec<PathBuf>, StoreError>;

    /// Look up a recording by its display name
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name_only = Path::new(name).file_name()? == name;
        let candidate = self.root().join(name);
        (name_only && self.exists(&candidate)).then_some(candidate)
    }

    /// The most recent recording, if any
    fn latest(&self) -> Result<Option<PathBuf>, StoreError> {
        Ok(self.list()?.pop())
    }
}
