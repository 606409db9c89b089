//! Network time abstraction.
//!
//! Network time is only ever a drift correction for the battery-backed
//! RTC. Queries may fail at any time; callers retry on a schedule and
//! never block the stepping loop on the network.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::traits::{NetworkTimeSource, NtpSample};
//! use rs_pulseclock::hal::MockNetworkTime;
//!
//! let mut ntp = MockNetworkTime::new();
//! ntp.queue_sample(NtpSample::new(1_609_459_200, 250, 10));
//!
//! let sample = ntp.query("pool.ntp.org").unwrap();
//! assert_eq!(sample.epoch_secs, 1_609_459_200);
//! assert_eq!(ntp.queried, ["pool.ntp.org"]);
//! ```

use crate::error::NtpError;

/// One successful network time reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NtpSample {
    /// Seconds since the Unix epoch (1970-01-01T00:00:00Z).
    pub epoch_secs: u64,
    /// Fractional part of the second, in milliseconds.
    pub millis: u16,
    /// Local monotonic timestamp (ms) when the reply arrived.
    pub local_ms: u64,
}

impl NtpSample {
    /// Creates a sample.
    pub const fn new(epoch_secs: u64, millis: u16, local_ms: u64) -> Self {
        Self {
            epoch_secs,
            millis,
            local_ms,
        }
    }

    /// Epoch seconds as of `now_ms` on the same monotonic clock, rounding
    /// the fractional part down.
    pub fn epoch_secs_at(&self, now_ms: u64) -> u64 {
        let elapsed_ms = now_ms.saturating_sub(self.local_ms) + self.millis as u64;
        self.epoch_secs + elapsed_ms / 1000
    }
}

/// Client for a network time service.
///
/// # Implementation Notes
///
/// - One request per call, no internal retry
/// - Timeouts are reported as [`NtpError::Timeout`]
pub trait NetworkTimeSource {
    /// Query a single server.
    fn query(&mut self, server: &str) -> Result<NtpSample, NtpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_secs_at_accounts_for_elapsed_time() {
        let sample = NtpSample::new(1000, 600, 5_000);
        assert_eq!(sample.epoch_secs_at(5_000), 1000);
        // 600ms + 400ms crosses a whole second
        assert_eq!(sample.epoch_secs_at(5_400), 1001);
        assert_eq!(sample.epoch_secs_at(7_500), 1003);
    }

    #[test]
    fn epoch_secs_at_ignores_earlier_timestamps() {
        let sample = NtpSample::new(1000, 0, 5_000);
        assert_eq!(sample.epoch_secs_at(1_000), 1000);
    }
}
