//! Fixed capture format for every voice memo

use std::fmt;
use std::time::Duration as StdDuration;

/// Sample encoding of the stored waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// Signed integer linear PCM, little-endian
    LinearPcmLe,
}

/// Immutable audio format shared by capture, storage and playback.
///
/// The only instance in use is [`AudioFormat::STANDARD`]: 44.1 kHz, mono,
/// 16-bit signed little-endian PCM in a WAV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    pub const SAMPLE_RATE: u32 = 44_100;
    pub const CHANNELS: u16 = 1;
    pub const BITS_PER_SAMPLE: u16 = 16;

    pub const STANDARD: AudioFormat = AudioFormat {
        sample_rate: Self::SAMPLE_RATE,
        channels: Self::CHANNELS,
        bits_per_sample: Self::BITS_PER_SAMPLE,
        encoding: SampleEncoding::LinearPcmLe,
    };

    /// WAV header description for this format
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Whether a WAV header matches this format
    pub fn matches(&self, spec: &hound::WavSpec) -> bool {
        *spec == self.wav_spec()
    }

    /// Playback length of `samples` mono frames
    pub fn duration_of(&self, samples: u64) -> StdDuration {
        let frames = samples / u64::from(self.channels.max(1));
        StdDuration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.channels == 1 { "mono" } else { "multi-channel" };
        write!(
            f,
            "{} Hz, {}, {}-bit PCM LE",
            self.sample_rate, layout, self.bits_per_sample
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_format_values() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.channels, 1);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.encoding, SampleEncoding::LinearPcmLe);
    }

    #[test]
    fn wav_spec_is_integer_pcm() {
        let spec = AudioFormat::STANDARD.wav_spec();
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert!(AudioFormat::STANDARD.matches(&spec));

        let stereo = hound::WavSpec { channels: 2, ..spec };
        assert!(!AudioFormat::STANDARD.matches(&stereo));
    }

    #[test]
    fn duration_of_one_second() {
        let d = AudioFormat::STANDARD.duration_of(44_100);
        assert_eq!(d, StdDuration::from_secs(1));
        assert_eq!(AudioFormat::STANDARD.duration_of(0), StdDuration::ZERO);
    }

    #[test]
    fn display() {
        assert_eq!(
            AudioFormat::STANDARD.to_string(),
            "44100 Hz, mono, 16-bit PCM LE"
        );
    }
}
