//! Playback controller against the real file store

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tempfile::TempDir;
use tokio::sync::oneshot;

use voice_memo::application::ports::{
    AudioOutput, OutputSession, OutputStream, PlaybackError,
};
use voice_memo::application::PlaybackController;
use voice_memo::domain::config::NamingPolicy;
use voice_memo::domain::playback::PlaybackState;
use voice_memo::domain::recording::RecordedFile;
use voice_memo::infrastructure::LocalAudioFileStore;

type Log = Arc<Mutex<Vec<String>>>;
type Enders = Arc<Mutex<Vec<oneshot::Sender<Result<(), PlaybackError>>>>>;

/// Records open/halt events; the test decides when a source ends
#[derive(Clone, Default)]
struct FakeSpeaker {
    log: Log,
    enders: Enders,
}

struct FakeStream {
    name: String,
    log: Log,
    halted: bool,
}

impl OutputStream for FakeStream {
    fn halt(&mut self) {
        if !self.halted {
            self.halted = true;
            self.log.lock().unwrap().push(format!("halt {}", self.name));
        }
    }
}

#[async_trait]
impl AudioOutput for FakeSpeaker {
    async fn open(&self, path: &Path) -> Result<OutputSession, PlaybackError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.log.lock().unwrap().push(format!("open {}", name));

        let (tx, rx) = oneshot::channel();
        self.enders.lock().unwrap().push(tx);
        Ok(OutputSession {
            stream: Box::new(FakeStream {
                name,
                log: Arc::clone(&self.log),
                halted: false,
            }),
            ended: rx,
        })
    }
}

fn fixture() -> (TempDir, LocalAudioFileStore, RecordedFile, RecordedFile) {
    let dir = TempDir::new().unwrap();
    let store = LocalAudioFileStore::open(dir.path(), "input", NamingPolicy::Unique).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut files = Vec::new();
    for name in ["a.wav", "b.wav"] {
        let path = dir.path().join(name);
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();
        files.push(RecordedFile::existing(path, Local::now()));
    }
    let b = files.pop().unwrap();
    let a = files.pop().unwrap();
    (dir, store, a, b)
}

fn log(speaker: &FakeSpeaker) -> Vec<String> {
    speaker.log.lock().unwrap().clone()
}

#[tokio::test]
async fn missing_file_leaves_controller_untouched() {
    let (dir, store, _, _) = fixture();
    let speaker = FakeSpeaker::default();
    let controller = PlaybackController::new(store, speaker.clone());

    let ghost = RecordedFile::existing(dir.path().join("ghost.wav"), Local::now());
    let result = controller.play(&ghost).await;

    assert!(matches!(result, Err(PlaybackError::FileNotFound(_))));
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert!(controller.current().await.is_none());
    assert!(log(&speaker).is_empty());
}

#[tokio::test]
async fn second_play_releases_the_first() {
    let (_dir, store, a, b) = fixture();
    let speaker = FakeSpeaker::default();
    let controller = PlaybackController::new(store, speaker.clone());

    let first = controller.play(&a).await.unwrap();
    let second = controller.play(&b).await.unwrap();

    assert_eq!(first.state(), PlaybackState::Stopped);
    assert_eq!(second.state(), PlaybackState::Playing);
    assert_eq!(controller.state(), PlaybackState::Playing);
    assert_eq!(log(&speaker), ["open a.wav", "halt a.wav", "open b.wav"]);
}

#[tokio::test]
async fn natural_end_finishes_and_releases() {
    let (_dir, store, a, _) = fixture();
    let speaker = FakeSpeaker::default();
    let controller = PlaybackController::new(store, speaker.clone());

    let handle = controller.play(&a).await.unwrap();
    let ender = speaker.enders.lock().unwrap().pop().unwrap();
    ender.send(Ok(())).unwrap();

    let state = tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .unwrap();
    assert_eq!(state, PlaybackState::Finished);
    assert_eq!(controller.state(), PlaybackState::Finished);
    assert_eq!(log(&speaker), ["open a.wav", "halt a.wav"]);
}

#[tokio::test]
async fn stop_twice_is_the_same_as_once() {
    let (_dir, store, a, _) = fixture();
    let speaker = FakeSpeaker::default();
    let controller = PlaybackController::new(store, speaker.clone());

    let handle = controller.play(&a).await.unwrap();
    handle.stop();
    let after_one = (handle.state(), controller.state(), log(&speaker));
    handle.stop();
    let after_two = (handle.state(), controller.state(), log(&speaker));

    assert_eq!(after_one, after_two);
    assert_eq!(after_two.0, PlaybackState::Stopped);
}

#[tokio::test]
async fn broken_output_fails_the_handle() {
    let (_dir, store, a, _) = fixture();
    let speaker = FakeSpeaker::default();
    let controller = PlaybackController::new(store, speaker.clone());

    let handle = controller.play(&a).await.unwrap();
    let ender = speaker.enders.lock().unwrap().pop().unwrap();
    ender
        .send(Err(PlaybackError::PlaybackDeviceError("unplugged".into())))
        .unwrap();

    let state = tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .unwrap();
    assert_eq!(state, PlaybackState::Failed);
    assert_eq!(controller.state(), PlaybackState::Failed);
}
