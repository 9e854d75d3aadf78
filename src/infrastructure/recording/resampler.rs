//! Incremental sample-rate conversion for captured audio

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::CaptureError;

/// Input frames per resampler call
const CHUNK_SIZE: usize = 1024;

/// Converts mono i16 audio from the device rate to the target rate as it
/// arrives, so long recordings never sit in memory.
///
/// The resampler's own delay is trimmed from the front and flushed out at
/// the end, so output sample `n` lines up with input time `n / target_rate`.
pub struct StreamingResampler {
    inner: FftFixedIn<f32>,
    pending: Vec<f32>,
    source_rate: u64,
    target_rate: u64,
    /// Leading output frames still to discard
    delay: usize,
    consumed: u64,
    produced: u64,
}

impl StreamingResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, CaptureError> {
        let inner = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            CHUNK_SIZE,
            2, // Sub-chunks
            1, // Mono
        )
        .map_err(|e| CaptureError::OpenFailed(format!("Resampler init failed: {}", e)))?;

        Ok(Self {
            delay: inner.output_delay(),
            inner,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
            source_rate: u64::from(source_rate),
            target_rate: u64::from(target_rate),
            consumed: 0,
            produced: 0,
        })
    }

    /// Feed device samples; returns whatever output is ready.
    pub fn push(&mut self, samples: &[i16]) -> Result<Vec<i16>, CaptureError> {
        self.consumed += samples.len() as u64;
        self.pending
            .extend(samples.iter().map(|&s| f32::from(s) / 32768.0));

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            self.process(chunk, &mut output)?;
        }
        Ok(output)
    }

    /// Drain the tail, feeding silence until the delayed input is out.
    /// Output is trimmed so the total length matches the input length at
    /// the target rate.
    pub fn flush(&mut self) -> Result<Vec<i16>, CaptureError> {
        let expected = (self.consumed * self.target_rate).div_ceil(self.source_rate);
        let mut output = Vec::new();

        if !self.pending.is_empty() {
            let mut chunk = std::mem::take(&mut self.pending);
            chunk.resize(self.inner.input_frames_next(), 0.0);
            self.process(chunk, &mut output)?;
        }
        while self.produced < expected {
            let silence = vec![0.0; self.inner.input_frames_next()];
            if self.process(silence, &mut output)? == 0 {
                break;
            }
        }

        let excess = self.produced.saturating_sub(expected);
        let keep = (output.len() as u64).saturating_sub(excess) as usize;
        output.truncate(keep);
        self.produced -= excess.min(self.produced);
        Ok(output)
    }

    /// Resample one chunk, dropping frames still inside the delay.
    /// Returns how many frames the resampler emitted.
    fn process(&mut self, chunk: Vec<f32>, output: &mut Vec<i16>) -> Result<usize, CaptureError> {
        let resampled = self
            .inner
            .process(&[chunk], None)
            .map_err(|e| CaptureError::WriteFailed(format!("Resampling failed: {}", e)))?;

        let frames = &resampled[0];
        let skipped = self.delay.min(frames.len());
        self.delay -= skipped;

        let before = output.len();
        output.extend(
            frames[skipped..]
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
        );
        self.produced += (output.len() - before) as u64;
        Ok(frames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_at_48k_becomes_one_second_at_44k1() {
        let mut resampler = StreamingResampler::new(48_000, 44_100).unwrap();
        let input = vec![0i16; 48_000];

        let mut total = 0;
        for chunk in input.chunks(480) {
            total += resampler.push(chunk).unwrap().len();
        }
        total += resampler.flush().unwrap().len();

        assert_eq!(total, 44_100);
    }

    #[test]
    fn output_starts_with_the_signal() {
        let mut resampler = StreamingResampler::new(48_000, 44_100).unwrap();
        let input = vec![16_000i16; 4_800];

        let mut output = resampler.push(&input).unwrap();
        output.extend(resampler.flush().unwrap());

        assert_eq!(output.len(), 4_410);
        assert!(
            output[..64].iter().any(|&s| s > 8_000),
            "leading output is silent: {:?}",
            &output[..8]
        );
        let middle = output[output.len() / 2];
        assert!((15_000..=17_000).contains(&middle), "middle sample {middle}");
    }

    #[test]
    fn flush_without_input_is_empty() {
        let mut resampler = StreamingResampler::new(16_000, 44_100).unwrap();
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn small_pushes_are_buffered() {
        let mut resampler = StreamingResampler::new(48_000, 44_100).unwrap();
        assert!(resampler.push(&[0i16; 10]).unwrap().is_empty());
    }
}
