//! File naming policy for new recordings

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidNamingPolicyError;

/// How the file store names a new recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NamingPolicy {
    /// `<stem>.wav`, then `<stem>-1.wav`, `<stem>-2.wav`, ... never reusing an existing name
    #[default]
    Unique,
    /// Always `<stem>.wav`; a new recording replaces the previous one
    Overwrite,
}

impl NamingPolicy {
    pub const ALL: &'static [&'static str] = &["unique", "overwrite"];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Overwrite => "overwrite",
        }
    }
}

impl FromStr for NamingPolicy {
    type Err = InvalidNamingPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unique" => Ok(Self::Unique),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(InvalidNamingPolicyError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for NamingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
