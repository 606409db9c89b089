//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware, time and network
//! traits, enabling development and testing on desktop without a clock
//! movement attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockDriveLines`] | [`DriveLines`] | Tracks line levels, optional [`Trace`] |
//! | [`MockDelay`] | [`Delay`] | Totals delays, optional [`Trace`] |
//! | [`MockSensor`] | [`PositionSensor`] | Queued observations with a fallback |
//! | [`MockClock`] | [`Clock`] | Controllable monotonic time |
//! | [`MockTimeSource`] | [`TimeSource`] | Settable wall time and hand storage |
//! | [`MockRtc`] | [`RtcChip`] | In-memory RTC registers |
//! | [`MockNetworkTime`] | [`NetworkTimeSource`] | Queued samples and errors |
//! | [`MockDisplay`] | [`ClockDisplay`] | Tracks renders, queued user requests |
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::hal::{MockDelay, MockDriveLines, Trace, TraceEvent};
//! use rs_pulseclock::traits::{Delay, DriveLine, DriveLines};
//!
//! let trace = Trace::new();
//! let mut lines = MockDriveLines::with_trace(trace.clone());
//! let mut delay = MockDelay::with_trace(trace.clone());
//!
//! lines.set(DriveLine::Enable, true).unwrap();
//! delay.delay_ms(20);
//! lines.disable().unwrap();
//!
//! assert_eq!(
//!     trace.events(),
//!     vec![
//!         TraceEvent::Line(DriveLine::Enable, true),
//!         TraceEvent::Delay(20),
//!         TraceEvent::Line(DriveLine::Enable, false),
//!     ]
//! );
//! ```
//!
//! [`DriveLines`]: crate::traits::DriveLines
//! [`Delay`]: crate::traits::Delay
//! [`PositionSensor`]: crate::traits::PositionSensor
//! [`Clock`]: crate::traits::Clock
//! [`TimeSource`]: crate::traits::TimeSource
//! [`RtcChip`]: crate::traits::RtcChip
//! [`NetworkTimeSource`]: crate::traits::NetworkTimeSource
//! [`ClockDisplay`]: crate::traits::ClockDisplay

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::engine::{ClockState, UserRequest};
use crate::error::NtpError;
use crate::position::HmsTriple;
use crate::traits::{
    Clock, ClockDisplay, Delay, DriveLine, DriveLines, NetworkTimeSource, NtpSample,
    PositionSensor, RtcChip, SensorObservation, TimeSource,
};

// ============================================================================
// Trace
// ============================================================================

/// One recorded hardware event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// A drive line was set.
    Line(DriveLine, bool),
    /// A blocking delay elapsed.
    Delay(u32),
}

/// Shared, ordered log of line and delay events.
///
/// Clones share the same log, so one trace can be handed to both
/// [`MockDriveLines`] and [`MockDelay`] to check their interleaving.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl Trace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }

    /// Copy of all events so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    /// Forgets all events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock drive lines for testing.
///
/// Records the level of each line. Use [`fail_on`](Self::fail_on) to make
/// one line return an error.
///
/// # Example
///
/// ```rust
/// use rs_pulseclock::hal::MockDriveLines;
/// use rs_pulseclock::traits::{DriveLine, DriveLines};
///
/// let mut lines = MockDriveLines::new();
/// lines.set(DriveLine::Plus, true).unwrap();
///
/// assert!(lines.level(DriveLine::Plus));
/// assert!(!lines.level(DriveLine::Minus));
/// assert_eq!(lines.set_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockDriveLines {
    levels: [bool; 3],
    trace: Option<Trace>,
    fail_line: Option<DriveLine>,
    /// Number of successful `set` calls.
    pub set_count: usize,
}

impl MockDriveLines {
    /// Creates mock lines, all low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates mock lines that record into a shared trace.
    pub fn with_trace(trace: Trace) -> Self {
        Self {
            trace: Some(trace),
            ..Self::default()
        }
    }

    /// Makes every `set` of `line` fail.
    pub fn fail_on(&mut self, line: DriveLine) {
        self.fail_line = Some(line);
    }

    /// Current level of a line.
    pub fn level(&self, line: DriveLine) -> bool {
        self.levels[Self::index(line)]
    }

    /// Levels as `[plus, minus, enable]`.
    pub fn levels(&self) -> [bool; 3] {
        self.levels
    }

    fn index(line: DriveLine) -> usize {
        match line {
            DriveLine::Plus => 0,
            DriveLine::Minus => 1,
            DriveLine::Enable => 2,
        }
    }
}

impl DriveLines for MockDriveLines {
    type Error = ();

    fn set(&mut self, line: DriveLine, high: bool) -> Result<(), ()> {
        if self.fail_line == Some(line) {
            return Err(());
        }
        self.levels[Self::index(line)] = high;
        self.set_count += 1;
        if let Some(trace) = &self.trace {
            trace.push(TraceEvent::Line(line, high));
        }
        Ok(())
    }
}

/// Mock delay for testing. Returns immediately and totals the time asked for.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Sum of all delays in milliseconds.
    pub total_ms: u64,
    /// Number of `delay_ms` calls.
    pub calls: usize,
    trace: Option<Trace>,
}

impl MockDelay {
    /// Creates a new mock delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock delay that records into a shared trace.
    pub fn with_trace(trace: Trace) -> Self {
        Self {
            trace: Some(trace),
            ..Self::default()
        }
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms as u64;
        self.calls += 1;
        if let Some(trace) = &self.trace {
            trace.push(TraceEvent::Delay(ms));
        }
    }
}

/// Mock optical sensor for testing.
///
/// Each read takes the next queued observation, or the default observation
/// once the queue is empty.
///
/// # Example
///
/// ```rust
/// use rs_pulseclock::hal::MockSensor;
/// use rs_pulseclock::traits::{PositionSensor, SensorObservation};
///
/// let mut sensor = MockSensor::new().with_default(SensorObservation::new(5, false));
/// sensor.queue(SensorObservation::new(0, true));
///
/// assert_eq!(sensor.observe(), SensorObservation::new(0, true));
/// assert_eq!(sensor.observe(), SensorObservation::new(5, false));
/// assert_eq!(sensor.reads, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockSensor {
    queue: VecDeque<SensorObservation>,
    default: SensorObservation,
    level: bool,
    /// Number of counts consumed.
    pub reads: usize,
}

impl MockSensor {
    /// Creates a sensor that reports no edges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the observation returned once the queue is empty.
    pub fn with_default(mut self, obs: SensorObservation) -> Self {
        self.default = obs;
        self
    }

    /// Queue an observation.
    pub fn queue(&mut self, obs: SensorObservation) {
        self.queue.push_back(obs);
    }

    /// Queue several observations.
    pub fn queue_all(&mut self, obs: &[SensorObservation]) {
        self.queue.extend(obs.iter().copied());
    }

    /// Observations still queued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl PositionSensor for MockSensor {
    fn consume_count(&mut self) -> u32 {
        let obs = self.queue.pop_front().unwrap_or(self.default);
        self.level = obs.level;
        self.reads += 1;
        obs.edge_count
    }

    fn current_level(&self) -> bool {
        self.level
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_pulseclock::hal::MockClock;
/// use rs_pulseclock::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Time Mocks
// ============================================================================

/// Mock time source for testing the engine.
///
/// Wall time only moves when the test moves it.
///
/// # Example
///
/// ```rust
/// use rs_pulseclock::hal::MockTimeSource;
/// use rs_pulseclock::traits::TimeSource;
/// use rs_pulseclock::HmsTriple;
///
/// let mut time = MockTimeSource::new(HmsTriple::new(23, 59, 59), HmsTriple::default());
/// time.advance_secs(2);
/// assert_eq!(time.now().unwrap(), HmsTriple::new(0, 0, 1));
///
/// time.set_persisted_hand_position(HmsTriple::new(1, 2, 3)).unwrap();
/// assert_eq!(time.writes, [HmsTriple::new(1, 2, 3)]);
/// ```
#[derive(Debug, Default)]
pub struct MockTimeSource {
    /// Wall time returned by `now`.
    pub now: HmsTriple,
    /// Value returned by `is_synced`.
    pub synced: bool,
    /// Stored hand position.
    pub persisted: HmsTriple,
    /// Every hand position written, in order.
    pub writes: Vec<HmsTriple>,
    /// Make `now` fail.
    pub fail_now: bool,
    /// Make reading the hand position fail.
    pub fail_read: bool,
    /// Make writing the hand position fail.
    pub fail_write: bool,
}

impl MockTimeSource {
    /// Creates a time source at `now` with hands stored at `persisted`.
    pub fn new(now: HmsTriple, persisted: HmsTriple) -> Self {
        Self {
            now,
            persisted,
            ..Self::default()
        }
    }

    /// Moves wall time forward, wrapping at midnight.
    pub fn advance_secs(&mut self, secs: u32) {
        let t = (self.now.seconds_of_day() as u64 + secs as u64) % 86_400;
        self.now = HmsTriple::from_epoch_secs(t, 0);
    }
}

impl TimeSource for MockTimeSource {
    type Error = ();

    fn now(&mut self) -> Result<HmsTriple, ()> {
        if self.fail_now {
            return Err(());
        }
        Ok(self.now)
    }

    fn is_synced(&self) -> bool {
        self.synced
    }

    fn set_persisted_hand_position(&mut self, hands: HmsTriple) -> Result<(), ()> {
        if self.fail_write {
            return Err(());
        }
        self.persisted = hands;
        self.writes.push(hands);
        Ok(())
    }

    fn persisted_hand_position(&mut self) -> Result<HmsTriple, ()> {
        if self.fail_read {
            return Err(());
        }
        Ok(self.persisted)
    }
}

/// Mock RTC chip with in-memory registers.
#[derive(Debug, Default)]
pub struct MockRtc {
    /// Time register.
    pub time: HmsTriple,
    /// Hand-position register.
    pub hands: HmsTriple,
    /// Number of `write_time` calls.
    pub writes: usize,
    /// Make every register access fail.
    pub fail: bool,
}

impl MockRtc {
    /// Creates an RTC at 00:00:00 with hands at 12:00:00.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), ()> {
        if self.fail {
            Err(())
        } else {
            Ok(())
        }
    }
}

impl RtcChip for MockRtc {
    type Error = ();

    fn read_time(&mut self) -> Result<HmsTriple, ()> {
        self.check()?;
        Ok(self.time)
    }

    fn write_time(&mut self, time: HmsTriple) -> Result<(), ()> {
        self.check()?;
        self.time = time;
        self.writes += 1;
        Ok(())
    }

    fn read_hands(&mut self) -> Result<HmsTriple, ()> {
        self.check()?;
        Ok(self.hands)
    }

    fn write_hands(&mut self, hands: HmsTriple) -> Result<(), ()> {
        self.check()?;
        self.hands = hands;
        Ok(())
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock network time client.
///
/// Replies are returned in the order queued; an empty queue answers with
/// [`NtpError::Timeout`]. Every server asked is recorded in `queried`.
#[derive(Debug, Default)]
pub struct MockNetworkTime {
    replies: VecDeque<Result<NtpSample, NtpError>>,
    /// Servers queried, in order.
    pub queried: Vec<String>,
}

impl MockNetworkTime {
    /// Creates a client with no replies queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn queue_sample(&mut self, sample: NtpSample) {
        self.replies.push_back(Ok(sample));
    }

    /// Queue a failed reply.
    pub fn queue_error(&mut self, error: NtpError) {
        self.replies.push_back(Err(error));
    }
}

impl NetworkTimeSource for MockNetworkTime {
    fn query(&mut self, server: &str) -> Result<NtpSample, NtpError> {
        self.queried.push(server.into());
        self.replies.pop_front().unwrap_or(Err(NtpError::Timeout))
    }
}

// ============================================================================
// Display Mock
// ============================================================================

/// Mock display for testing.
///
/// # Example
///
/// ```
/// use rs_pulseclock::hal::MockDisplay;
/// use rs_pulseclock::traits::ClockDisplay;
/// use rs_pulseclock::UserRequest;
///
/// let mut display = MockDisplay::new();
/// display.init().unwrap();
/// assert_eq!(display.render_count, 0);
///
/// display.queue_request(UserRequest::Pause);
/// assert_eq!(display.take_request(), Some(UserRequest::Pause));
/// assert_eq!(display.take_request(), None);
/// ```
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// The last state that was rendered.
    pub last_state: Option<ClockState>,
    /// Number of times render() was called.
    pub render_count: usize,
    /// Last message shown via show_message().
    pub last_message: Option<(String, Option<String>)>,
    /// Whether init() was called.
    pub initialized: bool,
    requests: VecDeque<UserRequest>,
}

impl MockDisplay {
    /// Creates a new mock display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a user request for `take_request`.
    pub fn queue_request(&mut self, request: UserRequest) {
        self.requests.push_back(request);
    }
}

impl ClockDisplay for MockDisplay {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        self.initialized = true;
        Ok(())
    }

    fn render(&mut self, state: &ClockState) -> Result<(), ()> {
        self.last_state = Some(*state);
        self.render_count += 1;
        Ok(())
    }

    fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), ()> {
        self.last_message = Some((line1.into(), line2.map(Into::into)));
        Ok(())
    }

    fn take_request(&mut self) -> Option<UserRequest> {
        self.requests.pop_front()
    }
}

// ============================================================================
// Tests
// ============================================================================
