//! Recording session state machine

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Stopped,
    Denied,
    Failed,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingPermission => "requesting-permission",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Denied => "denied",
            Self::Failed => "failed",
        }
    }

    /// Terminal states end an attempt; only `reset` leaves them.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Denied | Self::Failed)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecordingState,
    pub action: String,
}

/// Recording session entity.
///
/// State machine:
///   IDLE -> REQUESTING_PERMISSION (begin_permission_request)
///   REQUESTING_PERMISSION -> DENIED (deny)
///   REQUESTING_PERMISSION -> RECORDING (begin_recording)
///   REQUESTING_PERMISSION | RECORDING -> FAILED (fail)
///   RECORDING -> STOPPED (finish)
///   STOPPED | DENIED | FAILED -> IDLE (reset)
///
/// The target file is present exactly while the state is RECORDING or STOPPED.
#[derive(Debug, Default, Clone)]
pub struct RecordingSession {
    state: RecordingState,
    target_file: Option<PathBuf>,
    started_at: Option<DateTime<Local>>,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn target_file(&self) -> Option<&Path> {
        self.target_file.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecordingState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    fn require(
        &self,
        allowed: &[RecordingState],
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(InvalidStateTransition {
                current_state: self.state,
                action: action.to_string(),
            })
        }
    }

    /// Transition from IDLE to REQUESTING_PERMISSION
    pub fn begin_permission_request(&mut self) -> Result<(), InvalidStateTransition> {
        self.require(&[RecordingState::Idle], "start recording")?;
        self.state = RecordingState::RequestingPermission;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION to DENIED
    pub fn deny(&mut self) -> Result<(), InvalidStateTransition> {
        self.require(&[RecordingState::RequestingPermission], "deny access")?;
        self.state = RecordingState::Denied;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION to RECORDING once the device is open
    pub fn begin_recording(
        &mut self,
        target_file: PathBuf,
        started_at: DateTime<Local>,
    ) -> Result<(), InvalidStateTransition> {
        self.require(&[RecordingState::RequestingPermission], "begin recording")?;
        self.state = RecordingState::Recording;
        self.target_file = Some(target_file);
        self.started_at = Some(started_at);
        Ok(())
    }

    /// Transition to FAILED after a device or finalize error.
    /// Drops the target so no half-written file is referenced.
    pub fn fail(&mut self) -> Result<(), InvalidStateTransition> {
        self.require(
            &[RecordingState::RequestingPermission, RecordingState::Recording],
            "fail recording",
        )?;
        self.state = RecordingState::Failed;
        self.target_file = None;
        self.started_at = None;
        Ok(())
    }

    /// Transition from RECORDING to STOPPED
    pub fn finish(&mut self) -> Result<(), InvalidStateTransition> {
        self.require(&[RecordingState::Recording], "stop recording")?;
        self.state = RecordingState::Stopped;
        Ok(())
    }

    /// Return to IDLE from a terminal state so a new attempt can start
    pub fn reset(&mut self) -> Result<(), InvalidStateTransition> {
        self.require(
            &[
                RecordingState::Idle,
                RecordingState::Stopped,
                RecordingState::Denied,
                RecordingState::Failed,
            ],
            "reset session",
        )?;
        *self = Self::new();
        Ok(())
    }
}
