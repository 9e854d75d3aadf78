//! Recording session use case

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::domain::recording::{AudioFormat, RecordedFile};
use crate::domain::session::{InvalidStateTransition, RecordingSession, RecordingState};

use super::capture_lock::{CaptureLease, CaptureLock};
use super::ports::{
    AudioFileStore, CaptureDevice, CaptureError, CaptureStream, CaptureSummary, PermissionGate,
};

/// Errors from the recording use case
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Failed to open capture device: {0}")]
    DeviceOpenFailed(String),

    #[error("Recording storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to finalize recording: {0}")]
    FinalizeFailed(String),
}

/// The open device plus the lease proving nobody else has it.
struct ActiveCapture {
    stream: Box<dyn CaptureStream>,
    lease: CaptureLease,
}

impl ActiveCapture {
    async fn finish(self) -> Result<CaptureSummary, CaptureError> {
        let Self { stream, lease } = self;
        let result = stream.finish().await;
        drop(lease);
        result
    }
}

struct SessionInner {
    session: RecordingSession,
    capture: Option<ActiveCapture>,
}

/// Recording session manager.
///
/// Owns one [`RecordingSession`] and, while recording, the capture device.
/// Every transition is published on a watch channel so a presentation
/// layer can follow along with [`subscribe`](Self::subscribe).
pub struct RecordingSessionManager<G, S, D>
where
    G: PermissionGate,
    S: AudioFileStore,
    D: CaptureDevice,
{
    gate: G,
    store: S,
    device: D,
    capture_lock: CaptureLock,
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<RecordingState>>,
}

impl<G, S, D> RecordingSessionManager<G, S, D>
where
    G: PermissionGate,
    S: AudioFileStore,
    D: CaptureDevice,
{
    pub fn new(gate: G, store: S, device: D, capture_lock: CaptureLock) -> Self {
        let (state_tx, _) = watch::channel(RecordingState::Idle);
        Self {
            gate,
            store,
            device,
            capture_lock,
            inner: Arc::new(Mutex::new(SessionInner {
                session: RecordingSession::new(),
                capture: None,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Current state, without waiting on any operation in flight
    pub fn current_state(&self) -> RecordingState {
        *self.state_tx.borrow()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.state_tx.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn target_file(&self) -> Option<PathBuf> {
        let inner = self.inner.lock().await;
        inner.session.target_file().map(Path::to_path_buf)
    }

    pub async fn started_at(&self) -> Option<DateTime<Local>> {
        self.inner.lock().await.session.started_at()
    }

    /// Whether this session currently owns an open capture device
    pub async fn holds_device(&self) -> bool {
        self.inner.lock().await.capture.is_some()
    }

    /// Ask for microphone access and, once granted, start recording.
    ///
    /// Only valid from `Idle`. Resolves to `Recording` on success, `Denied`
    /// when access is refused and `Failed` when the device cannot be opened.
    pub async fn start(&self) -> Result<(), RecordingError> {
        {
            let mut inner = self.inner.lock().await;
            inner.session.begin_permission_request()?;
            self.publish(RecordingState::RequestingPermission);
        }

        // Declared before the session lock so it drops after it
        let mut guard = StartGuard {
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
            stage: Some(StartStage::AwaitingAnswer),
        };
        let authorization = self.gate.request_access().await;
        let mut inner = self.inner.lock().await;

        if !authorization.is_granted() {
            guard.disarm();
            inner.session.deny()?;
            self.publish(RecordingState::Denied);
            info!("microphone access denied");
            return Err(RecordingError::PermissionDenied);
        }

        guard.stage = Some(StartStage::Opening);
        let opened = self.open_capture().await;
        guard.disarm();

        match opened {
            Ok((path, capture)) => {
                inner.session.begin_recording(path.clone(), Local::now())?;
                inner.capture = Some(capture);
                self.publish(RecordingState::Recording);
                info!(path = %path.display(), "recording started");
                Ok(())
            }
            Err(e) => {
                inner.session.fail()?;
                self.publish(RecordingState::Failed);
                warn!(error = %e, "could not start recording");
                Err(e)
            }
        }
    }

    /// Stop recording and return the finished file.
    ///
    /// Only valid from `Recording`. The device is released on every path;
    /// a file that cannot be finalized moves the session to `Failed`.
    pub async fn stop(&self) -> Result<RecordedFile, RecordingError> {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_recording() {
            return Err(InvalidStateTransition {
                current_state: inner.session.state(),
                action: "stop recording".to_string(),
            }
            .into());
        }

        let target = inner.session.target_file().map(Path::to_path_buf);
        let outcome = match inner.capture.take() {
            Some(capture) => capture.finish().await.map_err(|e| e.to_string()),
            None => Err("no open capture".to_string()),
        };

        match (outcome, target) {
            (Ok(summary), Some(path)) => {
                inner.session.finish()?;
                self.publish(RecordingState::Stopped);
                let file =
                    RecordedFile::new(path, AudioFormat::STANDARD, Local::now(), summary.samples);
                info!(
                    file = %file.display_name(),
                    samples = summary.samples,
                    "recording stopped"
                );
                Ok(file)
            }
            (outcome, _) => {
                let message = outcome
                    .err()
                    .unwrap_or_else(|| "session has no target file".to_string());
                inner.session.fail()?;
                self.publish(RecordingState::Failed);
                warn!(error = %message, "recording could not be finalized");
                Err(RecordingError::FinalizeFailed(message))
            }
        }
    }

    /// Return to `Idle` after a terminal state so a new attempt can start.
    pub async fn reset(&self) -> Result<(), RecordingError> {
        let mut inner = self.inner.lock().await;
        inner.session.reset()?;
        self.publish(RecordingState::Idle);
        Ok(())
    }

    async fn open_capture(&self) -> Result<(PathBuf, ActiveCapture), RecordingError> {
        let lease = self.capture_lock.try_acquire().ok_or_else(|| {
            RecordingError::DeviceOpenFailed("capture device busy".to_string())
        })?;

        let path = self
            .store
            .allocate_path()
            .map_err(|e| RecordingError::StorageUnavailable(e.to_string()))?;

        debug!(path = %path.display(), "opening capture device");
        let stream = match self.device.open(&path, AudioFormat::STANDARD).await {
            Ok(stream) => stream,
            Err(e) => {
                self.store.release(&path);
                return Err(RecordingError::DeviceOpenFailed(e.to_string()));
            }
        };

        Ok((path, ActiveCapture { stream, lease }))
    }

    fn publish(&self, state: RecordingState) {
        publish(&self.state_tx, state);
    }
}

fn publish(state_tx: &watch::Sender<RecordingState>, state: RecordingState) {
    debug!(%state, "recording state changed");
    state_tx.send_replace(state);
}

/// How far a `start` call got before its future was dropped
#[derive(Debug, Clone, Copy)]
enum StartStage {
    AwaitingAnswer,
    Opening,
}

/// Settles a `start` call whose future was dropped mid-flight, so the
/// session never stays in `RequestingPermission`. Before the answer the
/// request counts as denied; once access was granted it counts as failed.
struct StartGuard {
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<RecordingState>>,
    stage: Option<StartStage>,
}

impl StartGuard {
    fn disarm(&mut self) {
        self.stage = None;
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        let Some(stage) = self.stage.take() else {
            return;
        };

        if let Ok(mut inner) = self.inner.try_lock() {
            settle_abandoned(&mut inner, &self.state_tx, stage);
            return;
        }

        // Someone else holds the session right now; settle once they let go
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                let state_tx = Arc::clone(&self.state_tx);
                handle.spawn(async move {
                    let mut inner = inner.lock().await;
                    settle_abandoned(&mut inner, &state_tx, stage);
                });
            }
            Err(_) => warn!("start abandoned outside a runtime, session left unsettled"),
        }
    }
}

fn settle_abandoned(
    inner: &mut SessionInner,
    state_tx: &watch::Sender<RecordingState>,
    stage: StartStage,
) {
    if inner.session.state() != RecordingState::RequestingPermission {
        return;
    }
    let (settled, state) = match stage {
        StartStage::AwaitingAnswer => (inner.session.deny(), RecordingState::Denied),
        StartStage::Opening => (inner.session.fail(), RecordingState::Failed),
    };
    if settled.is_ok() {
        publish(state_tx, state);
        info!(%state, "start abandoned before it finished");
    }
}
