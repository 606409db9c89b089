//! Network time correction for the battery-backed clock.
//!
//! The RTC is the authority for wall time until a network sample arrives.
//! While a sample is fresh (within `sync_validity_secs`) wall time is
//! derived from it and the RTC is rewritten on each sync. When the network
//! goes away the RTC carries on alone.
//!
//! Syncs are polled from the stepping loop between ticks, never during a
//! pulse, and are rescheduled hourly on success and every few minutes on
//! failure.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::config::NtpConfig;
//! use rs_pulseclock::hal::{MockClock, MockNetworkTime, MockRtc};
//! use rs_pulseclock::sync::{SyncScheduler, SyncedTimeSource};
//! use rs_pulseclock::traits::{NtpSample, TimeSource};
//! use rs_pulseclock::HmsTriple;
//!
//! let ntp_config = NtpConfig::default();
//! let mut scheduler = SyncScheduler::new(&ntp_config);
//! let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &ntp_config);
//! assert!(!time.is_synced());
//!
//! let mut ntp = MockNetworkTime::new();
//! // 2021-01-01T10:30:00Z
//! ntp.queue_sample(NtpSample::new(1_609_497_000, 0, 0));
//!
//! let result = time.poll_sync(&mut ntp, &ntp_config, &mut scheduler);
//! assert_eq!(result, Some(Ok(())));
//! assert!(time.is_synced());
//! assert_eq!(time.now().unwrap(), HmsTriple::new(10, 30, 0));
//! assert_eq!(time.rtc().time, HmsTriple::new(10, 30, 0));
//! ```

use log::{info, warn};

use crate::config::{NtpConfig, ShortString};
use crate::error::NtpError;
use crate::position::HmsTriple;
use crate::traits::{Clock, NetworkTimeSource, NtpSample, RtcChip, TimeSource};

// ============================================================================
// Scheduling
// ============================================================================

/// When the next network sync is due.
#[derive(Clone, Debug)]
pub struct SyncScheduler {
    next_due_ms: u64,
    success_interval_ms: u64,
    retry_interval_ms: u64,
    last_success_ms: Option<u64>,
    consecutive_failures: u32,
}

impl SyncScheduler {
    /// Create a scheduler with the first sync due immediately.
    pub fn new(config: &NtpConfig) -> Self {
        Self {
            next_due_ms: 0,
            success_interval_ms: config.success_interval_secs as u64 * 1000,
            retry_interval_ms: config.retry_interval_secs as u64 * 1000,
            last_success_ms: None,
            consecutive_failures: 0,
        }
    }

    /// True if a sync should be attempted now.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_due_ms
    }

    /// Reschedule after a successful sync.
    pub fn record_success(&mut self, now_ms: u64) {
        self.last_success_ms = Some(now_ms);
        self.consecutive_failures = 0;
        self.next_due_ms = now_ms + self.success_interval_ms;
    }

    /// Reschedule after a failed sync.
    pub fn record_failure(&mut self, now_ms: u64) {
        self.consecutive_failures += 1;
        self.next_due_ms = now_ms + self.retry_interval_ms;
    }

    /// Time the next sync is due.
    pub fn next_due_ms(&self) -> u64 {
        self.next_due_ms
    }

    /// Time of the last successful sync.
    pub fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }

    /// Failed attempts since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Query each server in turn and return the first good sample.
pub fn run_sync<N: NetworkTimeSource>(
    ntp: &mut N,
    servers: &[ShortString],
) -> Result<NtpSample, NtpError> {
    for server in servers {
        match ntp.query(server) {
            Ok(sample) => return Ok(sample),
            Err(e) => warn!("NTP {} failed: {}", server.as_str(), e),
        }
    }
    Err(NtpError::AllServersFailed)
}

// ============================================================================
// Time source
// ============================================================================

/// [`TimeSource`] over an [`RtcChip`], corrected by network time.
pub struct SyncedTimeSource<R: RtcChip, C: Clock> {
    rtc: R,
    clock: C,
    utc_offset_secs: i32,
    validity_ms: u64,
    sample: Option<NtpSample>,
}

impl<R: RtcChip, C: Clock> SyncedTimeSource<R, C> {
    /// Wrap an RTC. `clock` must be the monotonic clock samples are
    /// stamped with.
    pub fn new(rtc: R, clock: C, config: &NtpConfig) -> Self {
        Self {
            rtc,
            clock,
            utc_offset_secs: config.utc_offset_secs,
            validity_ms: config.sync_validity_secs as u64 * 1000,
            sample: None,
        }
    }

    /// Accept a network sample as the current reference.
    pub fn apply_sample(&mut self, sample: NtpSample) {
        let local = HmsTriple::from_epoch_secs(
            sample.epoch_secs_at(self.clock.now_ms()),
            self.utc_offset_secs,
        );
        info!("network time {} (epoch {})", local, sample.epoch_secs);
        self.sample = Some(sample);
    }

    /// Time of day according to the network sample, if it is still fresh.
    pub fn network_time(&self) -> Option<HmsTriple> {
        let now_ms = self.clock.now_ms();
        self.sample
            .filter(|s| now_ms.saturating_sub(s.local_ms) <= self.validity_ms)
            .map(|s| HmsTriple::from_epoch_secs(s.epoch_secs_at(now_ms), self.utc_offset_secs))
    }

    /// Bring the RTC in line: rewritten from network time while synced,
    /// left as the authority otherwise.
    pub fn align(&mut self) -> Result<(), R::Error> {
        if let Some(network) = self.network_time() {
            let rtc = self.rtc.read_time()?;
            if rtc != network {
                info!("RTC {} -> {}", rtc, network);
                self.rtc.write_time(network)?;
            }
        }
        Ok(())
    }

    /// Run a sync if one is due. Returns `None` if nothing was attempted.
    pub fn poll_sync<N: NetworkTimeSource>(
        &mut self,
        ntp: &mut N,
        config: &NtpConfig,
        scheduler: &mut SyncScheduler,
    ) -> Option<Result<(), NtpError>> {
        let now_ms = self.clock.now_ms();
        if !config.enabled || config.servers.is_empty() || !scheduler.is_due(now_ms) {
            return None;
        }

        match run_sync(ntp, &config.servers) {
            Ok(sample) => {
                self.apply_sample(sample);
                if let Err(e) = self.align() {
                    warn!("RTC update failed: {:?}", e);
                }
                scheduler.record_success(now_ms);
                Some(Ok(()))
            }
            Err(e) => {
                scheduler.record_failure(now_ms);
                warn!(
                    "{}; retry in {}s",
                    e,
                    (scheduler.next_due_ms() - now_ms) / 1000
                );
                Some(Err(e))
            }
        }
    }

    /// The underlying RTC.
    pub fn rtc(&self) -> &R {
        &self.rtc
    }

    /// The underlying RTC, mutably.
    pub fn rtc_mut(&mut self) -> &mut R {
        &mut self.rtc
    }

    /// The monotonic clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The monotonic clock, mutably.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

impl<R: RtcChip, C: Clock> TimeSource for SyncedTimeSource<R, C> {
    type Error = R::Error;

    fn now(&mut self) -> Result<HmsTriple, R::Error> {
        match self.network_time() {
            Some(t) => Ok(t),
            None => self.rtc.read_time(),
        }
    }

    fn is_synced(&self) -> bool {
        self.network_time().is_some()
    }

    fn set_persisted_hand_position(&mut self, hands: HmsTriple) -> Result<(), R::Error> {
        self.rtc.write_hands(hands)
    }

    fn persisted_hand_position(&mut self) -> Result<HmsTriple, R::Error> {
        self.rtc.read_hands()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::short_string;
    use crate::hal::{MockClock, MockNetworkTime, MockRtc};

    // 2021-01-01T00:00:00Z
    const NEW_YEAR: u64 = 1_609_459_200;

    fn config() -> NtpConfig {
        NtpConfig::default()
            .with_servers(&["a.example", "b.example"])
            .with_intervals(3600, 300)
            .with_sync_validity_secs(7200)
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    #[test]
    fn first_sync_due_immediately() {
        let scheduler = SyncScheduler::new(&config());
        assert!(scheduler.is_due(0));
        assert_eq!(scheduler.last_success_ms(), None);
    }

    #[test]
    fn success_waits_an_hour() {
        let mut scheduler = SyncScheduler::new(&config());
        scheduler.record_success(10_000);
        assert!(!scheduler.is_due(10_000 + 3_599_999));
        assert!(scheduler.is_due(10_000 + 3_600_000));
        assert_eq!(scheduler.last_success_ms(), Some(10_000));
    }

    #[test]
    fn failure_retries_sooner() {
        let mut scheduler = SyncScheduler::new(&config());
        scheduler.record_failure(0);
        scheduler.record_failure(300_000);
        assert_eq!(scheduler.consecutive_failures(), 2);
        assert!(!scheduler.is_due(599_999));
        assert!(scheduler.is_due(600_000));

        scheduler.record_success(600_000);
        assert_eq!(scheduler.consecutive_failures(), 0);
    }

    // =========================================================================
    // Server fallback
    // =========================================================================

    #[test]
    fn falls_back_to_next_server() {
        let mut ntp = MockNetworkTime::new();
        ntp.queue_error(NtpError::Timeout);
        ntp.queue_sample(NtpSample::new(NEW_YEAR, 0, 0));

        let servers = [short_string("a.example"), short_string("b.example")];
        let sample = run_sync(&mut ntp, &servers).unwrap();
        assert_eq!(sample.epoch_secs, NEW_YEAR);
        assert_eq!(ntp.queried, ["a.example", "b.example"]);
    }

    #[test]
    fn all_servers_failing() {
        let mut ntp = MockNetworkTime::new();
        let servers = [short_string("a.example"), short_string("b.example")];
        assert_eq!(run_sync(&mut ntp, &servers), Err(NtpError::AllServersFailed));
        assert_eq!(ntp.queried.len(), 2);
    }

    // =========================================================================
    // Time source
    // =========================================================================

    #[test]
    fn rtc_is_authority_until_synced() {
        let mut rtc = MockRtc::new();
        rtc.time = HmsTriple::new(8, 15, 0);
        let mut time = SyncedTimeSource::new(rtc, MockClock::new(), &config());

        assert!(!time.is_synced());
        assert_eq!(time.now().unwrap(), HmsTriple::new(8, 15, 0));

        time.align().unwrap();
        assert_eq!(time.rtc().writes, 0);
    }

    #[test]
    fn network_time_advances_with_local_clock() {
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config());
        time.apply_sample(NtpSample::new(NEW_YEAR, 500, 0));
        assert_eq!(time.now().unwrap(), HmsTriple::new(0, 0, 0));

        time.clock_mut().advance(500);
        assert_eq!(time.now().unwrap(), HmsTriple::new(0, 0, 1));

        time.clock_mut().advance(61_000);
        assert_eq!(time.now().unwrap(), HmsTriple::new(0, 1, 2));
    }

    #[test]
    fn utc_offset_applied() {
        let config = config().with_utc_offset_secs(-5 * 3600);
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config);
        time.apply_sample(NtpSample::new(NEW_YEAR, 0, 0));
        assert_eq!(time.now().unwrap(), HmsTriple::new(19, 0, 0));
    }

    #[test]
    fn sync_expires() {
        let mut rtc = MockRtc::new();
        rtc.time = HmsTriple::new(1, 2, 3);
        let mut time = SyncedTimeSource::new(rtc, MockClock::new(), &config());
        time.apply_sample(NtpSample::new(NEW_YEAR, 0, 0));
        assert!(time.is_synced());

        time.clock_mut().advance(7_200_000);
        assert!(time.is_synced());
        time.clock_mut().advance(1);
        assert!(!time.is_synced());
        assert_eq!(time.now().unwrap(), HmsTriple::new(1, 2, 3));
    }

    #[test]
    fn align_rewrites_rtc_only_when_different() {
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config());
        time.apply_sample(NtpSample::new(NEW_YEAR + 3600, 0, 0));
        time.align().unwrap();
        assert_eq!(time.rtc().time, HmsTriple::new(1, 0, 0));
        assert_eq!(time.rtc().writes, 1);

        time.align().unwrap();
        assert_eq!(time.rtc().writes, 1);
    }

    #[test]
    fn hands_persist_in_rtc() {
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config());
        time.set_persisted_hand_position(HmsTriple::new(4, 5, 6)).unwrap();
        assert_eq!(time.persisted_hand_position().unwrap(), HmsTriple::new(4, 5, 6));
        assert_eq!(time.rtc().hands, HmsTriple::new(4, 5, 6));
    }

    // =========================================================================
    // Polling
    // =========================================================================

    #[test]
    fn poll_respects_schedule() {
        let config = config();
        let mut scheduler = SyncScheduler::new(&config);
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config);
        let mut ntp = MockNetworkTime::new();
        ntp.queue_sample(NtpSample::new(NEW_YEAR, 0, 0));

        assert_eq!(time.poll_sync(&mut ntp, &config, &mut scheduler), Some(Ok(())));
        assert_eq!(time.poll_sync(&mut ntp, &config, &mut scheduler), None);

        time.clock_mut().advance(3_600_000);
        assert_eq!(
            time.poll_sync(&mut ntp, &config, &mut scheduler),
            Some(Err(NtpError::AllServersFailed))
        );
        assert_eq!(scheduler.next_due_ms(), 3_600_000 + 300_000);
    }

    #[test]
    fn poll_skipped_when_disabled() {
        let config = config().with_enabled(false);
        let mut scheduler = SyncScheduler::new(&config);
        let mut time = SyncedTimeSource::new(MockRtc::new(), MockClock::new(), &config);
        let mut ntp = MockNetworkTime::new();
        assert_eq!(time.poll_sync(&mut ntp, &config, &mut scheduler), None);
        assert!(ntp.queried.is_empty());
    }

    #[test]
    fn rtc_failure_does_not_fail_sync() {
        let config = config();
        let mut scheduler = SyncScheduler::new(&config);
        let mut rtc = MockRtc::new();
        rtc.fail = true;
        let mut time = SyncedTimeSource::new(rtc, MockClock::new(), &config);
        let mut ntp = MockNetworkTime::new();
        ntp.queue_sample(NtpSample::new(NEW_YEAR, 0, 0));

        assert_eq!(time.poll_sync(&mut ntp, &config, &mut scheduler), Some(Ok(())));
        assert!(time.is_synced());
    }
}
