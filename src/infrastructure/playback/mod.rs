//! Speaker output adapters

mod rodio_output;

pub use rodio_output::{RodioAudioOutput, RodioStream};
