//! Application layer - Use cases and port interfaces
//!
//! Contains the recording and playback operations and the trait
//! definitions for the devices and storage they drive.

pub mod capture_lock;
pub mod playback;
pub mod ports;
pub mod recording;

// Re-export use cases
pub use capture_lock::{CaptureLease, CaptureLock};
pub use playback::{PlaybackController, PlaybackHandle};
pub use recording::{RecordingError, RecordingSessionManager};
