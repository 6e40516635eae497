//! Wall-clock timeout for a single process run
//!
//! Timeouts arrive as strings in the syntax of the GNU `timeout` wrapper: a
//! non-negative decimal number with an optional unit suffix (`s`, `m`, `h`,
//! `d`; seconds when omitted). `0` disables the limit.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Exit code reported for a run killed at its deadline (matches GNU `timeout`)
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid time interval '{0}'")]
pub struct TimeoutParseError(pub String);

/// Optional wall-clock limit; `None` means unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeout(Option<Duration>);

impl Timeout {
    pub const UNLIMITED: Timeout = Timeout(None);

    pub fn from_duration(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::UNLIMITED
        } else {
            Self(Some(duration))
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.0
    }

    #[allow(dead_code)]
    pub fn is_unlimited(&self) -> bool {
        self.0.is_none()
    }
}

impl FromStr for Timeout {
    type Err = TimeoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeoutParseError(s.to_string());
        let trimmed = s.trim();

        let (number, multiplier) = match trimmed.chars().last() {
            Some('s') => (&trimmed[..trimmed.len() - 1], 1.0),
            Some('m') => (&trimmed[..trimmed.len() - 1], 60.0),
            Some('h') => (&trimmed[..trimmed.len() - 1], 3600.0),
            Some('d') => (&trimmed[..trimmed.len() - 1], 86400.0),
            Some(_) => (trimmed, 1.0),
            None => return Err(invalid()),
        };

        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        let mut duration =
            Duration::try_from_secs_f64(value * multiplier).map_err(|_| invalid())?;
        // only an exact zero disables the limit
        if value > 0.0 {
            duration = duration.max(Duration::from_nanos(1));
        }
        Ok(Self::from_duration(duration))
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(duration) => write!(f, "{:?}", duration),
            None => write!(f, "unlimited"),
        }
    }
}
