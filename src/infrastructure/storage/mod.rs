//! Recording storage adapters

mod local;

pub use local::{LocalAudioFileStore, RECORDING_EXTENSION};
