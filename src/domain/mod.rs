//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on devices or the filesystem.

pub mod config;
pub mod error;
pub mod playback;
pub mod recording;
pub mod session;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use playback::PlaybackState;
pub use recording::{AudioFormat, Duration, RecordedFile, SampleEncoding};
pub use session::{InvalidStateTransition, RecordingSession, RecordingState};
