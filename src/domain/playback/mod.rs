//! Playback state

use std::fmt;

/// State of a playback handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    /// Halted before the end of the file; output released
    Stopped,
    /// Reached the natural end of the file; output released
    Finished,
    Failed,
}

impl PlaybackState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Whether the output device has been given back
    pub const fn is_released(&self) -> bool {
        !matches!(self, Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_playing_holds_output() {
        assert!(!PlaybackState::Playing.is_released());
        for state in [
            PlaybackState::Idle,
            PlaybackState::Stopped,
            PlaybackState::Finished,
            PlaybackState::Failed,
        ] {
            assert!(state.is_released());
        }
    }

    #[test]
    fn display() {
        assert_eq!(PlaybackState::Finished.to_string(), "finished");
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }
}
