//! Recording value objects

mod duration;
mod file;
mod format;

pub use duration::{Duration, DEFAULT_MAX_DURATION_SECS};
pub use file::RecordedFile;
pub use format::{AudioFormat, SampleEncoding};
