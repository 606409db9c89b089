//! Error types for configuration, the stepping engine, and network time.
//!
//! Hardware traits keep their own associated `Error` types; the engine
//! folds those into [`ClockError`] after logging the underlying cause.

use core::fmt;

/// Settings validation failures.
///
/// All of these are fatal at start-up: there are no safe default pulse
/// timings for an unknown movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required settings key is missing.
    MissingKey(&'static str),
    /// A duration that must be non-zero is zero.
    ZeroDuration(&'static str),
    /// `PulseCount` must be at least one.
    ZeroPulseCount,
    /// Two logical lines are mapped to the same pin.
    DuplicatePin(u8),
    /// The normal step takes longer than one second, so the hands could
    /// never keep up with real time.
    StepTooLong {
        /// Total duration of the step sequence in milliseconds.
        duration_ms: u32,
    },
    /// The settings document could not be parsed.
    Malformed,
    /// The settings file could not be read.
    Unreadable,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey(key) => write!(f, "missing settings key '{}'", key),
            Self::ZeroDuration(key) => write!(f, "settings key '{}' must be non-zero", key),
            Self::ZeroPulseCount => write!(f, "PulseCount must be at least 1"),
            Self::DuplicatePin(pin) => write!(f, "pin {} assigned to more than one line", pin),
            Self::StepTooLong { duration_ms } => {
                write!(f, "step sequence takes {}ms (limit 1000ms)", duration_ms)
            }
            Self::Malformed => write!(f, "malformed settings document"),
            Self::Unreadable => write!(f, "settings file could not be read"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// Errors surfaced by [`ClockEngine`](crate::ClockEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockError {
    /// Setting a drive line failed.
    Drive,
    /// Reading the time source (wall time or persisted hands) failed.
    TimeSourceRead,
    /// Persisting the hand position failed.
    TimeSourceWrite,
    /// The persisted hand position is not a valid time of day.
    InvalidPersistedPosition,
    /// Configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive => write!(f, "drive line error"),
            Self::TimeSourceRead => write!(f, "time source read failed"),
            Self::TimeSourceWrite => write!(f, "time source write failed"),
            Self::InvalidPersistedPosition => write!(f, "persisted hand position is invalid"),
            Self::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl core::error::Error for ClockError {}

impl From<ConfigError> for ClockError {
    fn from(e: ConfigError) -> Self {
        ClockError::Config(e)
    }
}

/// Network time query failures. Never fatal; the sync schedule retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NtpError {
    /// Server name could not be resolved.
    Resolve,
    /// Socket bind/send/receive error.
    Socket,
    /// No reply within the configured timeout.
    Timeout,
    /// Reply shorter than a full 48-byte NTP packet.
    ShortResponse,
    /// Reply was not in server mode.
    BadMode,
    /// Server stratum was 0 (kiss-o'-death) or unsynchronised.
    BadStratum(u8),
    /// Every configured server failed.
    AllServersFailed,
}

impl fmt::Display for NtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "NTP server name resolution failed"),
            Self::Socket => write!(f, "NTP socket error"),
            Self::Timeout => write!(f, "NTP request timed out"),
            Self::ShortResponse => write!(f, "NTP response too short"),
            Self::BadMode => write!(f, "NTP response not in server mode"),
            Self::BadStratum(s) => write!(f, "NTP server stratum {} rejected", s),
            Self::AllServersFailed => write!(f, "all NTP servers failed"),
        }
    }
}

impl core::error::Error for NtpError {}
