//! The per-tick stepping engine.
//!
//! [`ClockEngine`] compares wall time with where the hands point and
//! decides each tick whether to idle, step once, or fast-step. The decision
//! itself is the pure function [`decide`].
//!
//! # Modes
//!
//! | Mode | Condition | Action |
//! |------|-----------|--------|
//! | `Run` | hands on time | idle |
//! | `Run` | hands one second behind | [`step`](crate::driver::PulseDriver::step) |
//! | `Wait` | hands ahead by less than `max_lead_secs`, second hand at 12 | idle |
//! | `Fast` | anything else | [`fast_step`](crate::driver::PulseDriver::fast_step) |
//!
//! Hands that are slightly ahead are parked rather than driven almost a
//! full lap. While parked the second hand sits at 12.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::{ClockEngine, ClockMode, HmsTriple};
//! use rs_pulseclock::config::{EngineConfig, PulseConfig};
//! use rs_pulseclock::driver::PulseDriver;
//! use rs_pulseclock::hal::{MockDelay, MockDriveLines, MockSensor, MockTimeSource};
//! use rs_pulseclock::tracker::HandTracker;
//! use rs_pulseclock::traits::SensorObservation;
//!
//! let pulse = PulseConfig {
//!     pulse_ms: 100, dwell_ms: 50, stop_ms: 50, recover_ms: 100, pulse_count: 2,
//!     fast_pulse1_ms: 60, fast_dwell_ms: 30, fast_pulse2_ms: 30, fast_stop_ms: 60,
//! };
//! let sensor = MockSensor::new().with_default(SensorObservation::new(5, false));
//! let driver = PulseDriver::new(MockDriveLines::new(), MockDelay::new(), sensor, pulse);
//! let config = EngineConfig::default().with_align_on_start(false);
//! let mut engine = ClockEngine::new(driver, HandTracker::new(config.stall_limit), config);
//!
//! let mut time = MockTimeSource::new(HmsTriple::new(15, 0, 1), HmsTriple::new(3, 0, 0));
//! engine.start(&mut time).unwrap();
//!
//! let outcome = engine.tick(&mut time).unwrap();
//! assert_eq!(outcome.decision.mode, ClockMode::Run);
//! assert_eq!(engine.hands().to_triple(), HmsTriple::new(3, 0, 1));
//! assert_eq!(time.persisted, HmsTriple::new(3, 0, 1));
//! ```

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::driver::PulseDriver;
use crate::error::ClockError;
use crate::position::{HandPosition, HmsTriple, HALF_DAY_SECS};
use crate::tracker::{PositionTracker, TrackerReport};
use crate::traits::{Delay, DriveLines, PositionSensor, TimeSource};

// ============================================================================
// Decision
// ============================================================================

/// What the engine is doing with the hands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ClockMode {
    /// Hands are keeping time.
    #[default]
    Run,
    /// Hands are slightly ahead and parked until wall time catches up.
    Wait,
    /// Hands are behind and being fast-stepped.
    Fast,
}

impl ClockMode {
    /// Returns the mode as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClockMode::Run => "run",
            ClockMode::Wait => "wait",
            ClockMode::Fast => "fast",
        }
    }
}

/// Pulse to issue this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepAction {
    /// No pulse.
    Idle,
    /// One normal step.
    Step,
    /// One fast step.
    FastStep,
}

/// Result of [`decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    /// Mode to report.
    pub mode: ClockMode,
    /// Pulse to issue.
    pub action: StepAction,
    /// Seconds the hands must move forward to show wall time.
    pub gap: u32,
}

impl Decision {
    const fn new(mode: ClockMode, action: StepAction, gap: u32) -> Self {
        Self { mode, action, gap }
    }
}

/// Decide the mode and pulse from the forward gap and the shown second.
///
/// `gap` is `(wanted - shown) mod 43200`; see [`HandPosition::gap_to`].
///
/// ```rust
/// use rs_pulseclock::config::EngineConfig;
/// use rs_pulseclock::engine::{decide, ClockMode, StepAction};
///
/// let config = EngineConfig::default();
/// assert_eq!(decide(1, 59, &config).action, StepAction::Step);
/// assert_eq!(decide(21_600, 0, &config).mode, ClockMode::Fast);
/// // Hands one minute ahead with the second hand at 12
/// assert_eq!(decide(43_140, 0, &config).mode, ClockMode::Wait);
/// ```
pub fn decide(gap: u32, shown_second: u8, config: &EngineConfig) -> Decision {
    let gap = gap % HALF_DAY_SECS;
    let wait_above = HALF_DAY_SECS - config.max_lead_secs.min(HALF_DAY_SECS);
    match gap {
        0 => Decision::new(ClockMode::Run, StepAction::Idle, gap),
        1 => Decision::new(ClockMode::Run, StepAction::Step, gap),
        _ if shown_second == 0 && gap > wait_above => {
            Decision::new(ClockMode::Wait, StepAction::Idle, gap)
        }
        _ => Decision::new(ClockMode::Fast, StepAction::FastStep, gap),
    }
}

/// Aligns a nominal position with the tracker's second by the shortest
/// signed adjustment.
pub fn reconcile(nominal: HandPosition, tracked_second: u8) -> HandPosition {
    let delta = (tracked_second as i32 - nominal.second() as i32 + 90).rem_euclid(60) - 30;
    nominal.offset_by(delta)
}

// ============================================================================
// State types
// ============================================================================

/// Conditions the engine reports but keeps running through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockFault {
    /// The sensor has seen no motion for longer than the stall limit.
    Jammed,
}

impl ClockFault {
    /// Short description for displays and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClockFault::Jammed => "jammed",
        }
    }
}

/// Requests from the user interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UserRequest {
    /// The hands physically show this time.
    SetHands(HmsTriple),
    /// The hands physically show the current wall time.
    SyncHandsToNow,
    /// Stop stepping.
    Pause,
    /// Resume stepping.
    Resume,
}

/// What one [`ClockEngine::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    /// Wall time read this tick.
    pub wall: HmsTriple,
    /// Mode and pulse chosen.
    pub decision: Decision,
    /// Hand position after the tick.
    pub hands: HandPosition,
    /// Tracker verdict if a pulse was issued.
    pub report: Option<TrackerReport>,
}

impl TickOutcome {
    /// True if a pulse was issued.
    pub fn stepped(&self) -> bool {
        self.report.is_some()
    }
}

/// Snapshot for displays and logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockState {
    /// Wall time of day.
    pub wall: HmsTriple,
    /// Where the hands point.
    pub hands: HandPosition,
    /// Current mode.
    pub mode: ClockMode,
    /// Wall time recently corroborated by network time.
    pub synced: bool,
    /// Stepping paused by the user.
    pub paused: bool,
    /// Active fault, if any.
    pub fault: Option<ClockFault>,
    /// Tracker's second-hand position.
    pub second_position: u8,
    /// Current run of zero-edge steps.
    pub consecutive_stalls: u32,
    /// Phase corrections since start-up.
    pub phase_corrections: u32,
}

// ============================================================================
// Engine
// ============================================================================

/// Keeps the hands on wall time.
///
/// # Type Parameters
///
/// - `L`, `D`, `S`: the [`PulseDriver`]'s lines, delay and sensor
/// - `K`: the [`PositionTracker`]
pub struct ClockEngine<L: DriveLines, D: Delay, S: PositionSensor, K: PositionTracker> {
    driver: PulseDriver<L, D, S>,
    tracker: K,
    config: EngineConfig,
    hands: HandPosition,
    mode: ClockMode,
    fault: Option<ClockFault>,
    paused: bool,
    steps: u64,
}

impl<L, D, S, K> ClockEngine<L, D, S, K>
where
    L: DriveLines,
    D: Delay,
    S: PositionSensor,
    K: PositionTracker,
{
    /// Create an engine. Call [`start`](Self::start) before ticking.
    pub fn new(driver: PulseDriver<L, D, S>, tracker: K, config: EngineConfig) -> Self {
        Self {
            driver,
            tracker,
            config,
            hands: HandPosition::default(),
            mode: ClockMode::Run,
            fault: None,
            paused: false,
            steps: 0,
        }
    }

    /// Load the persisted hand position and seed the tracker from it.
    ///
    /// With `align_on_start`, repeats the last pulse the movement received
    /// so a mechanism left half-way settles; the hands do not advance.
    pub fn start<T: TimeSource>(&mut self, time: &mut T) -> Result<HandPosition, ClockError> {
        let persisted = time.persisted_hand_position().map_err(|e| {
            warn!("reading persisted hands failed: {:?}", e);
            ClockError::TimeSourceRead
        })?;
        let persisted = persisted.validate().map_err(|e| {
            warn!("persisted hands {} rejected", persisted);
            e
        })?;

        self.hands = HandPosition::from_triple(persisted);
        self.tracker.reset_to(self.hands.second());
        self.fault = None;
        info!("hands at {}", self.hands);

        if self.config.align_on_start {
            let polarity = self.tracker.next_polarity().flipped();
            debug!("alignment pulse {}", polarity.as_str());
            self.driver.step(polarity).map_err(drive_error)?;
        }
        Ok(self.hands)
    }

    /// Run one decision and at most one pulse.
    ///
    /// On a time-source read failure nothing moves and the last known
    /// position is kept.
    pub fn tick<T: TimeSource>(&mut self, time: &mut T) -> Result<TickOutcome, ClockError> {
        let wall = time.now().map_err(|e| {
            warn!("reading wall time failed: {:?}", e);
            ClockError::TimeSourceRead
        })?;
        let gap = self.hands.gap_to(HandPosition::from_triple(wall));

        let decision = if self.paused {
            Decision::new(ClockMode::Wait, StepAction::Idle, gap)
        } else {
            decide(gap, self.hands.second(), &self.config)
        };

        if decision.mode != self.mode {
            info!(
                "{} -> {} (wall {} hands {})",
                self.mode.as_str(),
                decision.mode.as_str(),
                wall,
                self.hands
            );
            self.mode = decision.mode;
        }

        let report = match decision.action {
            StepAction::Idle => None,
            StepAction::Step => Some(self.pulse(false, time)?),
            StepAction::FastStep => Some(self.pulse(true, time)?),
        };

        Ok(TickOutcome {
            wall,
            decision,
            hands: self.hands,
            report,
        })
    }

    fn pulse<T: TimeSource>(&mut self, fast: bool, time: &mut T) -> Result<TrackerReport, ClockError> {
        let polarity = self.tracker.next_polarity();
        let obs = if fast && !self.tracker.is_jammed() {
            self.driver.fast_step(polarity)
        } else {
            self.driver.step(polarity)
        }
        .map_err(drive_error)?;

        let report = self.tracker.record(obs);
        self.hands = reconcile(self.hands.advance(), report.second);
        self.steps += 1;
        self.update_fault(report.jammed);

        time.set_persisted_hand_position(self.hands.to_triple())
            .map_err(|e| {
                warn!("persisting hands {} failed: {:?}", self.hands, e);
                ClockError::TimeSourceWrite
            })?;
        Ok(report)
    }

    fn update_fault(&mut self, jammed: bool) {
        match (self.fault, jammed) {
            (None, true) => {
                warn!("movement jammed at {}", self.hands);
                self.fault = Some(ClockFault::Jammed);
            }
            (Some(_), false) => {
                info!("jam cleared at {}", self.hands);
                self.fault = None;
            }
            _ => {}
        }
    }

    /// Apply a user request.
    pub fn apply_request<T: TimeSource>(
        &mut self,
        request: UserRequest,
        time: &mut T,
    ) -> Result<(), ClockError> {
        match request {
            UserRequest::SetHands(hands) => self.set_hands(hands.validate()?, time),
            UserRequest::SyncHandsToNow => {
                let now = time.now().map_err(|e| {
                    warn!("reading wall time failed: {:?}", e);
                    ClockError::TimeSourceRead
                })?;
                self.set_hands(now, time)
            }
            UserRequest::Pause => {
                info!("paused at {}", self.hands);
                self.paused = true;
                Ok(())
            }
            UserRequest::Resume => {
                info!("resumed at {}", self.hands);
                self.paused = false;
                Ok(())
            }
        }
    }

    fn set_hands<T: TimeSource>(&mut self, hands: HmsTriple, time: &mut T) -> Result<(), ClockError> {
        self.hands = HandPosition::from_triple(hands);
        self.tracker.reset_to(self.hands.second());
        self.fault = None;
        info!("hands set to {}", self.hands);
        time.set_persisted_hand_position(self.hands.to_triple())
            .map_err(|e| {
                warn!("persisting hands {} failed: {:?}", self.hands, e);
                ClockError::TimeSourceWrite
            })
    }

    /// Sleep for the idle interval. Call when a tick issued no pulse.
    pub fn idle(&mut self) {
        let ms = self.config.idle_interval_ms;
        self.driver.delay_mut().delay_ms(ms);
    }

    /// Snapshot for displays.
    pub fn state<T: TimeSource>(&self, time: &T, wall: HmsTriple) -> ClockState {
        ClockState {
            wall,
            hands: self.hands,
            mode: self.mode,
            synced: time.is_synced(),
            paused: self.paused,
            fault: self.fault,
            second_position: self.tracker.second_position(),
            consecutive_stalls: self.tracker.consecutive_stalls(),
            phase_corrections: self.tracker.phase_corrections(),
        }
    }

    /// Where the hands point.
    pub fn hands(&self) -> HandPosition {
        self.hands
    }

    /// Current mode.
    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Active fault, if any.
    pub fn fault(&self) -> Option<ClockFault> {
        self.fault
    }

    /// True while stepping is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pulses issued since start-up, excluding the alignment pulse.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The position tracker.
    pub fn tracker(&self) -> &K {
        &self.tracker
    }

    /// The pulse driver.
    pub fn driver(&self) -> &PulseDriver<L, D, S> {
        &self.driver
    }

    /// The pulse driver, mutably.
    pub fn driver_mut(&mut self) -> &mut PulseDriver<L, D, S> {
        &mut self.driver
    }
}

fn drive_error<E: core::fmt::Debug>(e: E) -> ClockError {
    warn!("drive line error: {:?}", e);
    ClockError::Drive
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // decide()
    // =========================================================================

    #[test]
    fn on_time_is_idle() {
        let config = EngineConfig::default();
        for second in 0..60 {
            let d = decide(0, second, &config);
            assert_eq!(d.mode, ClockMode::Run);
            assert_eq!(d.action, StepAction::Idle);
        }
    }

    #[test]
    fn one_behind_steps() {
        let config = EngineConfig::default();
        let d = decide(1, 0, &config);
        assert_eq!(d.mode, ClockMode::Run);
        assert_eq!(d.action, StepAction::Step);
    }

    #[test]
    fn far_behind_fast_steps() {
        let config = EngineConfig::default();
        let d = decide(21_600, 0, &config);
        assert_eq!(d.mode, ClockMode::Fast);
        assert_eq!(d.action, StepAction::FastStep);
        assert_eq!(decide(2, 30, &config).mode, ClockMode::Fast);
    }

    #[test]
    fn slightly_ahead_waits_only_at_twelve() {
        let config = EngineConfig::default();
        // 10 minutes ahead
        assert_eq!(decide(HALF_DAY_SECS - 600, 0, &config).mode, ClockMode::Wait);
        assert_eq!(decide(HALF_DAY_SECS - 600, 1, &config).mode, ClockMode::Fast);
    }

    #[test]
    fn wait_boundary() {
        let config = EngineConfig::default();
        let threshold = HALF_DAY_SECS - config.max_lead_secs;
        assert_eq!(decide(threshold, 0, &config).mode, ClockMode::Fast);
        assert_eq!(decide(threshold + 1, 0, &config).mode, ClockMode::Wait);
        assert_eq!(decide(HALF_DAY_SECS - 1, 0, &config).mode, ClockMode::Wait);
    }

    #[test]
    fn oversized_lead_waits_anywhere_at_twelve() {
        let mut config = EngineConfig::default();
        config.max_lead_secs = 50_000;
        assert_eq!(decide(5, 0, &config).mode, ClockMode::Wait);
        assert_eq!(decide(5, 1, &config).mode, ClockMode::Fast);
        assert_eq!(decide(1, 0, &config).action, StepAction::Step);
    }

    #[test]
    fn wait_threshold_is_configurable() {
        let config = EngineConfig::default().with_max_lead_secs(0);
        assert_eq!(decide(HALF_DAY_SECS - 1, 0, &config).mode, ClockMode::Fast);

        let config = EngineConfig::default().with_max_lead_secs(36_000);
        assert_eq!(decide(7_201, 0, &config).mode, ClockMode::Wait);
    }

    // =========================================================================
    // reconcile()
    // =========================================================================

    #[test]
    fn reconcile_agreeing_positions() {
        let nominal = HandPosition::from_hms(1, 2, 30);
        assert_eq!(reconcile(nominal, 30), nominal);
    }

    #[test]
    fn reconcile_takes_shortest_path_across_minute() {
        // Nominal :00 of 1:03, tracker still on :59 -> back into 1:02
        let nominal = HandPosition::from_hms(1, 3, 0);
        assert_eq!(reconcile(nominal, 59), HandPosition::from_hms(1, 2, 59));

        // Nominal :58, tracker already on :02 -> forward into next minute
        let nominal = HandPosition::from_hms(1, 2, 58);
        assert_eq!(reconcile(nominal, 2), HandPosition::from_hms(1, 3, 2));
    }

    #[test]
    fn reconcile_wraps_the_dial() {
        let nominal = HandPosition::new(0);
        assert_eq!(reconcile(nominal, 59), HandPosition::new(HALF_DAY_SECS - 1));
    }

    #[test]
    fn reconcile_always_lands_on_tracked_second() {
        for secs in (0..HALF_DAY_SECS).step_by(131) {
            let nominal = HandPosition::new(secs);
            for tracked in 0..60 {
                let r = reconcile(nominal, tracked);
                assert_eq!(r.second(), tracked);
                let diff = nominal.gap_to(r).min(r.gap_to(nominal));
                assert!(diff <= 30);
            }
        }
    }

    #[test]
    fn mode_names() {
        assert_eq!(ClockMode::Run.as_str(), "run");
        assert_eq!(ClockMode::Wait.as_str(), "wait");
        assert_eq!(ClockMode::Fast.as_str(), "fast");
        assert_eq!(ClockFault::Jammed.as_str(), "jammed");
    }
}
