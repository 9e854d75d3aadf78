//! VoiceMemo - record short voice notes and play them back
//!
//! Captures the microphone to 44.1 kHz mono 16-bit WAV files in a private
//! per-user directory, gated on microphone access, and replays them.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: recording session state machine, audio format, durations, config
//! - **Application**: recording and playback use cases plus the port traits
//! - **Infrastructure**: cpal capture and permission probe, WAV storage,
//!   rodio playback, XDG config file
//! - **CLI**: argument parsing, presenter, signal handling and logging setup

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
