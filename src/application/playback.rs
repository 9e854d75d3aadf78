//! Playback use case

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::domain::playback::PlaybackState;
use crate::domain::recording::RecordedFile;

use super::ports::{AudioFileStore, AudioOutput, OutputStream, PlaybackError};

/// Controller-wide state that handles report into
#[derive(Clone)]
struct ControllerLink {
    state_tx: Arc<watch::Sender<PlaybackState>>,
    current: Arc<AtomicU64>,
}

struct HandleInner {
    source: RecordedFile,
    generation: u64,
    state_tx: watch::Sender<PlaybackState>,
    output: StdMutex<Option<Box<dyn OutputStream>>>,
    controller: ControllerLink,
}

impl HandleInner {
    /// Take the output out of the handle. Only the first caller gets it.
    fn take_output(&self) -> Option<Box<dyn OutputStream>> {
        self.output
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn set_state(&self, state: PlaybackState) {
        self.state_tx.send_replace(state);
        if self.controller.current.load(Ordering::Acquire) == self.generation {
            self.controller.state_tx.send_replace(state);
        }
        debug!(file = %self.source.display_name(), %state, "playback state changed");
    }

    fn on_ended(&self, outcome: Result<(), PlaybackError>) {
        // Already stopped by hand: nothing left to release
        let Some(mut output) = self.take_output() else {
            return;
        };
        output.halt();

        match outcome {
            Ok(()) => {
                info!(file = %self.source.display_name(), "playback finished");
                self.set_state(PlaybackState::Finished);
            }
            Err(e) => {
                warn!(file = %self.source.display_name(), error = %e, "playback failed");
                self.set_state(PlaybackState::Failed);
            }
        }
    }
}

/// Handle to one playback. Clones refer to the same playback.
#[derive(Clone)]
pub struct PlaybackHandle {
    inner: Arc<HandleInner>,
}

impl PlaybackHandle {
    pub fn source(&self) -> &RecordedFile {
        &self.inner.source
    }

    pub fn state(&self) -> PlaybackState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.state_tx.subscribe()
    }

    /// Halt playback and release the output. Calling it again has no effect.
    pub fn stop(&self) {
        if let Some(mut output) = self.inner.take_output() {
            output.halt();
            info!(file = %self.inner.source.display_name(), "playback stopped");
            self.inner.set_state(PlaybackState::Stopped);
        }
    }

    /// Wait until the handle leaves `Playing` and return the final state.
    pub async fn wait(&self) -> PlaybackState {
        let mut rx = self.subscribe();
        rx.wait_for(|state| state.is_released())
            .await
            .map_or(PlaybackState::Stopped, |state| *state)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("source", &self.inner.source.path())
            .field("state", &self.state())
            .finish()
    }
}

/// Plays finished recordings, one at a time.
pub struct PlaybackController<S, O>
where
    S: AudioFileStore,
    O: AudioOutput,
{
    store: S,
    output: O,
    current: Mutex<Option<PlaybackHandle>>,
    link: ControllerLink,
}

impl<S, O> PlaybackController<S, O>
where
    S: AudioFileStore,
    O: AudioOutput,
{
    pub fn new(store: S, output: O) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        Self {
            store,
            output,
            current: Mutex::new(None),
            link: ControllerLink {
                state_tx: Arc::new(state_tx),
                current: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    /// State of the most recent playback
    pub fn state(&self) -> PlaybackState {
        *self.link.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.link.state_tx.subscribe()
    }

    pub async fn current(&self) -> Option<PlaybackHandle> {
        self.current.lock().await.clone()
    }

    /// Play `file`, replacing whatever this controller is playing.
    ///
    /// A missing file leaves the controller untouched. The previous handle
    /// is stopped and its output released before the new one opens.
    pub async fn play(&self, file: &RecordedFile) -> Result<PlaybackHandle, PlaybackError> {
        if !self.store.exists(file.path()) {
            return Err(PlaybackError::FileNotFound(file.path().to_path_buf()));
        }

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.stop();
        }

        let generation = self.link.current.fetch_add(1, Ordering::AcqRel) + 1;
        let session = match self.output.open(file.path()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(file = %file.display_name(), error = %e, "could not start playback");
                self.link.state_tx.send_replace(PlaybackState::Failed);
                return Err(e);
            }
        };

        let (state_tx, _) = watch::channel(PlaybackState::Playing);
        let inner = Arc::new(HandleInner {
            source: file.clone(),
            generation,
            state_tx,
            output: StdMutex::new(Some(session.stream)),
            controller: self.link.clone(),
        });
        self.link.state_tx.send_replace(PlaybackState::Playing);
        info!(file = %file.display_name(), "playback started");

        let watcher = Arc::clone(&inner);
        let ended = session.ended;
        tokio::spawn(async move {
            let outcome = ended.await.unwrap_or_else(|_| {
                Err(PlaybackError::PlaybackDeviceError(
                    "output closed unexpectedly".to_string(),
                ))
            });
            watcher.on_ended(outcome);
        });

        let handle = PlaybackHandle { inner };
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// Stop the current playback, if any
    pub async fn stop(&self) {
        if let Some(handle) = self.current.lock().await.as_ref() {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{OutputSession, StoreError};
    use async_trait::async_trait;
    use chrono::Local;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use tokio::sync::oneshot;

    struct FixedStore {
        files: Vec<PathBuf>,
    }

    impl AudioFileStore for FixedStore {
        fn root(&self) -> &Path {
            Path::new("/memos")
        }

        fn allocate_path(&self) -> Result<PathBuf, StoreError> {
            Ok(PathBuf::from("/memos/unused.wav"))
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.iter().any(|f| f == path)
        }

        fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
            Ok(self.files.clone())
        }
    }

    type Log = Arc<StdMutex<Vec<String>>>;
    type Enders = Arc<StdMutex<HashMap<String, oneshot::Sender<Result<(), PlaybackError>>>>>;

    #[derive(Default)]
    struct MockOutput {
        log: Log,
        enders: Enders,
        broken: bool,
    }

    struct MockStream {
        name: String,
        log: Log,
        halted: bool,
    }

    impl OutputStream for MockStream {
        fn halt(&mut self) {
            if !self.halted {
                self.halted = true;
                self.log.lock().unwrap().push(format!("halt {}", self.name));
            }
        }
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        async fn open(&self, path: &Path) -> Result<OutputSession, PlaybackError> {
            if self.broken {
                return Err(PlaybackError::PlaybackDeviceError("no speaker".to_string()));
            }
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.log.lock().unwrap().push(format!("open {}", name));
            let (tx, rx) = oneshot::channel();
            self.enders.lock().unwrap().insert(name.clone(), tx);
            Ok(OutputSession {
                stream: Box::new(MockStream {
                    name,
                    log: Arc::clone(&self.log),
                    halted: false,
                }),
                ended: rx,
            })
        }
    }

    fn file(name: &str) -> RecordedFile {
        RecordedFile::existing(format!("/memos/{}", name), Local::now())
    }

    fn controller(output: MockOutput) -> PlaybackController<FixedStore, MockOutput> {
        let store = FixedStore {
            files: vec![PathBuf::from("/memos/a.wav"), PathBuf::from("/memos/b.wav")],
        };
        PlaybackController::new(store, output)
    }

    #[tokio::test]
    async fn missing_file_leaves_controller_alone() {
        let controller = controller(MockOutput::default());
        let playing = controller.play(&file("a.wav")).await.unwrap();

        let err = controller.play(&file("ghost.wav")).await.unwrap_err();
        assert!(matches!(err, PlaybackError::FileNotFound(_)));
        assert_eq!(playing.state(), PlaybackState::Playing);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn natural_end_finishes_and_releases() {
        let output = MockOutput::default();
        let (log, enders) = (Arc::clone(&output.log), Arc::clone(&output.enders));
        let controller = controller(output);

        let handle = controller.play(&file("a.wav")).await.unwrap();
        let ender = enders.lock().unwrap().remove("a.wav").unwrap();
        ender.send(Ok(())).unwrap();

        assert_eq!(handle.wait().await, PlaybackState::Finished);
        assert_eq!(controller.state(), PlaybackState::Finished);
        assert_eq!(*log.lock().unwrap(), vec!["open a.wav", "halt a.wav"]);
    }

    #[tokio::test]
    async fn second_play_replaces_first() {
        let output = MockOutput::default();
        let log = Arc::clone(&output.log);
        let controller = controller(output);

        let first = controller.play(&file("a.wav")).await.unwrap();
        let second = controller.play(&file("b.wav")).await.unwrap();

        assert_eq!(first.state(), PlaybackState::Stopped);
        assert_eq!(second.state(), PlaybackState::Playing);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["open a.wav", "halt a.wav", "open b.wav"]
        );
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let output = MockOutput::default();
        let log = Arc::clone(&output.log);
        let controller = controller(output);

        let handle = controller.play(&file("a.wav")).await.unwrap();
        handle.stop();
        let after_first = (handle.state(), log.lock().unwrap().clone());
        handle.stop();
        let after_second = (handle.state(), log.lock().unwrap().clone());

        assert_eq!(after_first, after_second);
        assert_eq!(after_first.0, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn end_after_stop_is_ignored() {
        let output = MockOutput::default();
        let enders = Arc::clone(&output.enders);
        let controller = controller(output);

        let handle = controller.play(&file("a.wav")).await.unwrap();
        controller.stop().await;
        let ender = enders.lock().unwrap().remove("a.wav").unwrap();
        let _ = ender.send(Ok(()));
        tokio::task::yield_now().await;

        assert_eq!(handle.wait().await, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn device_error_fails_controller() {
        let controller = controller(MockOutput {
            broken: true,
            ..Default::default()
        });

        let err = controller.play(&file("a.wav")).await.unwrap_err();
        assert!(matches!(err, PlaybackError::PlaybackDeviceError(_)));
        assert_eq!(controller.state(), PlaybackState::Failed);
        assert!(controller.current().await.is_none());
    }

    #[tokio::test]
    async fn stale_handle_does_not_drive_controller() {
        let output = MockOutput::default();
        let enders = Arc::clone(&output.enders);
        let controller = controller(output);

        let first = controller.play(&file("a.wav")).await.unwrap();
        let _second = controller.play(&file("b.wav")).await.unwrap();
        first.stop();

        // First handle's end signal arrives late
        if let Some(ender) = enders.lock().unwrap().remove("a.wav") {
            let _ = ender.send(Ok(()));
        }
        tokio::task::yield_now().await;
        assert_eq!(controller.state(), PlaybackState::Playing);
    }
}
