//! Recording session entity and its states

mod recording_session;

pub use recording_session::{InvalidStateTransition, RecordingSession, RecordingState};
