//! Infrastructure layer: adapters for the application ports

pub mod config;
pub mod permission;
pub mod playback;
pub mod recording;
pub mod storage;

pub use config::XdgConfigStore;
pub use permission::CpalPermissionGate;
pub use playback::RodioAudioOutput;
pub use recording::CpalCaptureDevice;
pub use storage::LocalAudioFileStore;
