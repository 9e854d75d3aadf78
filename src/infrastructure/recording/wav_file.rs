//! WAV file writer for captured audio

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::WavWriter;

use crate::application::ports::{CaptureError, CaptureSummary};
use crate::domain::recording::AudioFormat;

/// A WAV file being written. Abandoning it (drop without `finalize`) removes
/// the partial file.
pub struct WavFile {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
    samples: u64,
}

impl WavFile {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self, CaptureError> {
        let writer = WavWriter::create(path, format.wav_spec()).map_err(|e| {
            // hound may leave an empty file behind
            let _ = fs::remove_file(path);
            CaptureError::OpenFailed(format!("Failed to create {}: {}", path.display(), e))
        })?;

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            samples: 0,
        })
    }

    pub fn write(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CaptureError::WriteFailed("file already closed".to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::WriteFailed(e.to_string()))?;
        }
        self.samples += samples.len() as u64;
        Ok(())
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Flush, patch the header lengths and close the file.
    pub fn finalize(mut self) -> Result<CaptureSummary, CaptureError> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| CaptureError::FinalizeFailed("file already closed".to_string()))?;
        writer
            .finalize()
            .map_err(|e| CaptureError::FinalizeFailed(e.to_string()))?;

        Ok(CaptureSummary {
            samples: self.samples,
        })
    }
}

impl Drop for WavFile {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer);
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalized_file_is_standard_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.wav");

        let mut file = WavFile::create(&path, AudioFormat::STANDARD).unwrap();
        file.write(&[0, 1000, -1000, i16::MAX]).unwrap();
        assert_eq!(file.samples(), 4);
        let summary = file.finalize().unwrap();
        assert_eq!(summary.samples, 4);

        let reader = hound::WavReader::open(&path).unwrap();
        assert!(AudioFormat::STANDARD.matches(&reader.spec()));
        let samples: Vec<i16> = reader.into_samples().map(Result::unwrap).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[test]
    fn empty_file_is_still_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");

        let file = WavFile::create(&path, AudioFormat::STANDARD).unwrap();
        assert_eq!(file.finalize().unwrap().samples, 0);
        assert_eq!(hound::WavReader::open(&path).unwrap().duration(), 0);
    }

    #[test]
    fn abandoned_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");

        let mut file = WavFile::create(&path, AudioFormat::STANDARD).unwrap();
        file.write(&[1, 2, 3]).unwrap();
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("memo.wav");
        assert!(WavFile::create(&path, AudioFormat::STANDARD).is_err());
        assert!(!path.exists());
    }
}
