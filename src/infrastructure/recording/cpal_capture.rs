//! Microphone capture using cpal
//!
//! The cpal stream is not `Send`, so each capture lives on its own thread.
//! The thread owns the stream and the WAV file; the async side only holds
//! a stop channel and the join handle.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::resampler::StreamingResampler;
use super::wav_file::WavFile;
use crate::application::ports::{CaptureDevice, CaptureError, CaptureStream, CaptureSummary};
use crate::domain::recording::AudioFormat;

/// How often the capture thread drains buffered audio
const DRAIN_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// What the capture thread should do with the file when it stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRequest {
    Finish,
    Abandon,
}

/// Capture device backed by the default cpal input
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalCaptureDevice;

impl CpalCaptureDevice {
    pub fn new() -> Self {
        Self
    }

    fn input_device() -> Result<cpal::Device, CaptureError> {
        cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)
    }

    /// Pick an input configuration, preferring the target rate and fewer channels
    fn input_config(
        device: &cpal::Device,
        target_rate: u32,
    ) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported = device
            .supported_input_configs()
            .map_err(|e| CaptureError::OpenFailed(format!("Failed to get configs: {}", e)))?;

        let includes = |range: &cpal::SupportedStreamConfigRange| {
            range.min_sample_rate().0 <= target_rate && range.max_sample_rate().0 >= target_rate
        };

        let best = supported
            .filter(|range| matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32))
            .min_by_key(|range| (!includes(range), range.channels()))
            .ok_or_else(|| CaptureError::OpenFailed("No suitable input config found".into()))?;

        let sample_rate = if includes(&best) {
            SampleRate(target_rate)
        } else {
            best.max_sample_rate()
        };

        let config = StreamConfig {
            channels: best.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, best.sample_format()))
    }

    /// Average interleaved frames down to one channel
    fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    }

    fn build_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        tx: Sender<Vec<i16>>,
    ) -> Result<cpal::Stream, CaptureError> {
        let channels = config.channels;
        let on_error = |err: cpal::StreamError| warn!("Audio input stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(Self::mix_to_mono(data, channels));
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    let _ = tx.send(Self::mix_to_mono(&converted, channels));
                },
                on_error,
                None,
            ),
            other => {
                return Err(CaptureError::OpenFailed(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| CaptureError::OpenFailed(e.to_string()))
    }
}

#[async_trait]
impl CaptureDevice for CpalCaptureDevice {
    async fn open(
        &self,
        path: &Path,
        format: AudioFormat,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let path = path.to_path_buf();

        let thread = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || run_capture(path, format, ready_tx, stop_rx))
            .map_err(|e| CaptureError::OpenFailed(format!("Failed to spawn capture thread: {}", e)))?;

        let ready = ready_rx.await.unwrap_or_else(|_| {
            Err(CaptureError::OpenFailed(
                "Capture thread exited during startup".to_string(),
            ))
        });

        match ready {
            Ok(()) => Ok(Box::new(CpalCaptureStream {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            })),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }
}

/// Handle to a running capture thread
pub struct CpalCaptureStream {
    stop_tx: Option<Sender<StopRequest>>,
    thread: Option<JoinHandle<Result<CaptureSummary, CaptureError>>>,
}

impl CpalCaptureStream {
    fn signal_stop(&mut self, request: StopRequest) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(request);
        }
    }
}

#[async_trait]
impl CaptureStream for CpalCaptureStream {
    async fn finish(mut self: Box<Self>) -> Result<CaptureSummary, CaptureError> {
        self.signal_stop(StopRequest::Finish);
        let thread = self
            .thread
            .take()
            .ok_or_else(|| CaptureError::FinalizeFailed("capture already finished".into()))?;

        tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|e| CaptureError::FinalizeFailed(format!("Join task error: {}", e)))?
            .map_err(|_| CaptureError::FinalizeFailed("capture thread panicked".into()))?
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.signal_stop(StopRequest::Abandon);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Capture thread body. Reports startup through `ready`, then records until
/// `stop` fires. Only [`StopRequest::Finish`] keeps the file; an abandoned
/// or disconnected capture removes it.
fn run_capture(
    path: PathBuf,
    format: AudioFormat,
    ready: oneshot::Sender<Result<(), CaptureError>>,
    stop: Receiver<StopRequest>,
) -> Result<CaptureSummary, CaptureError> {
    let (samples_tx, samples_rx) = mpsc::channel::<Vec<i16>>();

    let started = CpalCaptureDevice::input_device().and_then(|device| {
        let (config, sample_format) = CpalCaptureDevice::input_config(&device, format.sample_rate)?;
        debug!(
            rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "opening input stream"
        );
        let stream = CpalCaptureDevice::build_stream(&device, &config, sample_format, samples_tx)?;
        stream
            .play()
            .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;

        let resampler = if config.sample_rate.0 == format.sample_rate {
            None
        } else {
            Some(StreamingResampler::new(config.sample_rate.0, format.sample_rate)?)
        };

        // Create the file last so a failed open leaves nothing on disk
        let file = WavFile::create(&path, format)?;
        Ok((stream, resampler, file))
    });

    let (stream, mut resampler, mut file) = match started {
        Ok(parts) => parts,
        Err(e) => {
            let _ = ready.send(Err(e.clone()));
            return Err(e);
        }
    };
    if ready.send(Ok(())).is_err() {
        debug!(path = %path.display(), "capture opener went away, discarding");
        return Err(CaptureError::OpenFailed("opener went away".into()));
    }

    let mut write_error: Option<CaptureError> = None;
    let mut write = |chunk: Vec<i16>, file: &mut WavFile, resampler: &mut Option<StreamingResampler>| {
        if write_error.is_some() {
            return;
        }
        let result = match resampler {
            Some(r) => r.push(&chunk).and_then(|out| file.write(&out)),
            None => file.write(&chunk),
        };
        if let Err(e) = result {
            warn!(error = %e, "dropping captured audio");
            write_error = Some(e);
        }
    };

    let request = wait_for_stop(&stop, || {
        for chunk in samples_rx.try_iter() {
            write(chunk, &mut file, &mut resampler);
        }
    });

    // Release the device before touching the file again
    drop(stream);
    if request == StopRequest::Abandon {
        debug!(path = %path.display(), "capture abandoned, discarding");
        return Err(CaptureError::FinalizeFailed("capture abandoned".into()));
    }
    for chunk in samples_rx.try_iter() {
        write(chunk, &mut file, &mut resampler);
    }
    if let Some(r) = resampler.as_mut() {
        match r.flush().and_then(|tail| file.write(&tail)) {
            Ok(()) => {}
            Err(e) => {
                write_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = write_error {
        return Err(CaptureError::FinalizeFailed(e.to_string()));
    }
    let summary = file.finalize()?;
    debug!(samples = summary.samples, path = %path.display(), "capture finalized");
    Ok(summary)
}

/// Run `drain` every [`DRAIN_INTERVAL`] until a stop request arrives.
/// A dropped sender counts as abandoning the capture.
fn wait_for_stop(stop: &Receiver<StopRequest>, mut drain: impl FnMut()) -> StopRequest {
    loop {
        match stop.recv_timeout(DRAIN_INTERVAL) {
            Ok(request) => return request,
            Err(RecvTimeoutError::Disconnected) => return StopRequest::Abandon,
            Err(RecvTimeoutError::Timeout) => drain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_to_mono_single_channel() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(CpalCaptureDevice::mix_to_mono(&mono, 1), mono);
    }

    #[test]
    fn mix_to_mono_two_channels() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(CpalCaptureDevice::mix_to_mono(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn mix_to_mono_does_not_overflow() {
        let loud = vec![i16::MAX, i16::MAX, i16::MIN, i16::MIN];
        assert_eq!(
            CpalCaptureDevice::mix_to_mono(&loud, 2),
            vec![i16::MAX, i16::MIN]
        );
    }

    #[test]
    fn finish_request_keeps_capture() {
        let (tx, rx) = mpsc::channel();
        tx.send(StopRequest::Finish).unwrap();
        assert_eq!(wait_for_stop(&rx, || {}), StopRequest::Finish);
    }

    #[test]
    fn dropped_handle_abandons_capture() {
        let (tx, rx) = mpsc::channel::<StopRequest>();
        let mut drains = 0;
        let closer = std::thread::spawn(move || {
            std::thread::sleep(DRAIN_INTERVAL * 3);
            drop(tx);
        });

        assert_eq!(wait_for_stop(&rx, || drains += 1), StopRequest::Abandon);
        assert!(drains >= 1);
        closer.join().unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn records_a_short_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");

        let stream = CpalCaptureDevice::new()
            .open(&path, AudioFormat::STANDARD)
            .await
            .unwrap();
        tokio::time::sleep(StdDuration::from_millis(300)).await;
        stream.finish().await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert!(AudioFormat::STANDARD.matches(&reader.spec()));
    }
}
