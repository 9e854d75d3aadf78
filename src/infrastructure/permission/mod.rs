//! Microphone permission adapters

mod cpal_probe;

pub use cpal_probe::CpalPermissionGate;
