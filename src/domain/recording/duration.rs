//! Duration value object for recording limits

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default safety limit for a single memo (5 minutes)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 300;

/// A positive recording length, parsed from strings like `30s`, `1m` or `1h2m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default auto-stop limit for a recording
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    /// Time left before this limit is reached, given the time already spent.
    pub fn remaining_after(&self, elapsed: StdDuration) -> StdDuration {
        self.as_std().saturating_sub(elapsed)
    }

    /// Whether `elapsed` has reached this limit
    pub fn is_reached_by(&self, elapsed: StdDuration) -> bool {
        elapsed >= self.as_std()
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Accepts any ordered combination of `<n>h`, `<n>m` and `<n>s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_lowercase();

        let mut total_secs: u64 = 0;
        let mut digits = String::new();
        // Units must appear in h, m, s order and at most once each
        let mut last_rank = 0u8;

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }

            let (rank, factor) = match ch {
                'h' => (1, 3600),
                'm' => (2, 60),
                's' => (3, 1),
                _ => return Err(invalid()),
            };
            if digits.is_empty() || rank <= last_rank {
                return Err(invalid());
            }

            let value: u64 = digits.parse().map_err(|_| invalid())?;
            total_secs = value
                .checked_mul(factor)
                .and_then(|v| total_secs.checked_add(v))
                .ok_or_else(invalid)?;
            digits.clear();
            last_rank = rank;
        }

        if !digits.is_empty() || last_rank == 0 || total_secs == 0 {
            return Err(invalid());
        }

        Ok(Self::from_secs(total_secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.as_secs();
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if seconds > 0 || total == 0 {
            write!(f, "{}s", seconds)?;
        }
        Ok(())
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_max_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_only() {
        let d: Duration = "30s".parse().unwrap();
        assert_eq!(d.as_secs(), 30);
        assert_eq!(d.as_millis(), 30_000);
    }

    #[test]
    fn parse_combined_units() {
        assert_eq!("2m30s".parse::<Duration>().unwrap().as_secs(), 150);
        assert_eq!("1h".parse::<Duration>().unwrap().as_secs(), 3600);
        assert_eq!("1h0m5s".parse::<Duration>().unwrap().as_secs(), 3605);
    }

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        assert_eq!("  1M30S ".parse::<Duration>().unwrap().as_secs(), 90);
    }

    #[test]
    fn parse_rejects_bad_input() {
        for input in ["", "30", "abc", "30x", "0s", "0m0s", "30s1m", "1m1m", "m"] {
            assert!(input.parse::<Duration>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn display_uses_largest_units() {
        assert_eq!(Duration::from_secs(30).to_string(), "30s");
        assert_eq!(Duration::from_secs(120).to_string(), "2m");
        assert_eq!(Duration::from_secs(150).to_string(), "2m30s");
        assert_eq!(Duration::from_secs(3660).to_string(), "1h1m");
    }

    #[test]
    fn default_is_five_minutes() {
        assert_eq!(Duration::default(), Duration::from_secs(300));
        assert_eq!(Duration::default().to_string(), "5m");
    }

    #[test]
    fn remaining_time_saturates() {
        let limit = Duration::from_secs(10);
        assert_eq!(
            limit.remaining_after(StdDuration::from_secs(4)),
            StdDuration::from_secs(6)
        );
        assert_eq!(limit.remaining_after(StdDuration::from_secs(40)), StdDuration::ZERO);
        assert!(limit.is_reached_by(StdDuration::from_secs(10)));
        assert!(!limit.is_reached_by(StdDuration::from_millis(9_999)));
    }
}
