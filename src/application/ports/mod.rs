//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod file_store;
pub mod output;
pub mod permission;

// Re-export common types
pub use capture::{CaptureDevice, CaptureError, CaptureStream, CaptureSummary};
pub use config::ConfigStore;
pub use file_store::{AudioFileStore, StoreError};
pub use output::{AudioOutput, OutputSession, OutputStream, PlaybackError};
pub use permission::{
    authorization_channel, Authorization, AuthorizationCallback, PendingAuthorization,
    PermissionGate,
};
