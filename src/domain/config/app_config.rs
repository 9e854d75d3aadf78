//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::naming::NamingPolicy;
use crate::domain::recording::Duration;

/// Default base name for recordings
pub const DEFAULT_FILE_STEM: &str = "input";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Recordings directory; the per-user data directory when unset
    pub storage_dir: Option<String>,
    pub file_stem: Option<String>,
    pub naming: Option<String>,
    pub max_duration: Option<String>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            storage_dir: None,
            file_stem: Some(DEFAULT_FILE_STEM.to_string()),
            naming: Some(NamingPolicy::default().to_string()),
            max_duration: Some(Duration::default_max_duration().to_string()),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            storage_dir: other.storage_dir.or(self.storage_dir),
            file_stem: other.file_stem.or(self.file_stem),
            naming: other.naming.or(self.naming),
            max_duration: other.max_duration.or(self.max_duration),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn file_stem_or_default(&self) -> &str {
        self.file_stem
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_FILE_STEM)
    }

    /// Get naming as parsed NamingPolicy, or default if not set/invalid
    pub fn naming_or_default(&self) -> NamingPolicy {
        self.naming
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    pub fn log_level_or_default(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
