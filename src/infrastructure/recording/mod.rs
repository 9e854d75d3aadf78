//! Recording infrastructure module
//!
//! Microphone capture through cpal, written as 44.1 kHz mono 16-bit WAV.

mod cpal_capture;
mod resampler;
mod wav_file;

pub use cpal_capture::{CpalCaptureDevice, CpalCaptureStream};
pub use resampler::StreamingResampler;
pub use wav_file::WavFile;
