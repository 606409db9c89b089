//! Closed-loop second-hand position tracking.
//!
//! After every pulse the engine hands the sensor observation to a
//! [`PositionTracker`], which decides how far the second hand really moved
//! and which polarity the next pulse must have.
//!
//! # Implementations
//!
//! | Tracker | Use |
//! |---------|-----|
//! | [`HandTracker`] | Movement with an optical sensor on the second-hand wheel |
//! | [`OpenLoopTracker`] | No sensor fitted; every pulse is assumed to land |
//!
//! # Edge classification
//!
//! | Edges | Interpretation |
//! |-------|----------------|
//! | 0 | No motion (possible stall) |
//! | 1..=9 | One step |
//! | 10+ | Several steps: `count / 5` |
//!
//! The `/ 5` undercounts on purpose: baseline bounce would otherwise
//! push the estimate ahead of the hand.
//!
//! # White phase
//!
//! The sense line reads white once every four seconds. Once the same
//! non-zero phase (`second % 4` at white) has been seen on more than
//! [`PHASE_CONFIRMATIONS`] consecutive white readings, the second position
//! is pulled back by that phase. An odd correction also flips the polarity
//! bias, since the even/odd parity assumption was wrong.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::tracker::{HandTracker, PositionTracker};
//! use rs_pulseclock::traits::SensorObservation;
//!
//! let mut tracker = HandTracker::new(20);
//! tracker.reset_to(38);
//!
//! let report = tracker.record(SensorObservation::new(3, false));
//! assert_eq!(report.second, 39);
//! assert_eq!(report.advanced, 1);
//! ```

use log::{debug, info, warn};

use crate::traits::{Polarity, SensorObservation};

/// Edge counts up to this value mean exactly one step.
pub const SINGLE_STEP_MAX_EDGES: u32 = 9;

/// Edges per step assumed when a count indicates several steps.
pub const EDGES_PER_STEP: u32 = 5;

/// Consecutive zero-edge steps between polarity bias flips.
pub const STALL_FLIP_INTERVAL: u32 = 4;

/// A phase must be seen on more than this many consecutive white readings
/// before it is corrected.
pub const PHASE_CONFIRMATIONS: u32 = 4;

/// Steps per diagnostic min/max window.
pub const EDGE_WINDOW: u32 = 60;

// ============================================================================
// Trait
// ============================================================================

/// Tracks the second hand from pulse to pulse.
pub trait PositionTracker {
    /// Account for one pulse and its sensor observation.
    fn record(&mut self, obs: SensorObservation) -> TrackerReport;

    /// Polarity for the next pulse.
    fn next_polarity(&self) -> Polarity;

    /// Believed second-hand position, `0..60`.
    fn second_position(&self) -> u8;

    /// Re-seed from an authoritative second position. Learned stall and
    /// phase state is discarded.
    fn reset_to(&mut self, second: u8);

    /// True while the movement appears jammed.
    fn is_jammed(&self) -> bool;

    /// Current run of consecutive zero-edge steps.
    fn consecutive_stalls(&self) -> u32 {
        0
    }

    /// Phase corrections applied since start-up.
    fn phase_corrections(&self) -> u32 {
        0
    }
}

/// What the tracker concluded from one pulse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerReport {
    /// Second position after this pulse.
    pub second: u8,
    /// Seconds the hand was credited with, before any phase correction.
    pub advanced: u8,
    /// No edges were seen.
    pub stalled: bool,
    /// The polarity bias was flipped (stall recovery or odd phase).
    pub bias_flipped: bool,
    /// Phase that was corrected, if a correction happened.
    pub phase_corrected: Option<u8>,
    /// The movement is considered jammed.
    pub jammed: bool,
    /// Edge bounds of a completed diagnostic window.
    pub window: Option<EdgeWindow>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Which phase of the four-second optical pattern reads white.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhitePhaseTracker {
    /// Phase (`second % 4`) seen on the latest white readings.
    pub expected_phase: u8,
    /// Consecutive white readings at `expected_phase`.
    pub consecutive_matches: u32,
}

impl WhitePhaseTracker {
    /// Creates an empty tracker.
    pub const fn new() -> Self {
        Self {
            expected_phase: 0,
            consecutive_matches: 0,
        }
    }

    /// Record a white reading at `phase`. Returns the phase to correct once
    /// a non-zero phase has been confirmed.
    pub fn observe(&mut self, phase: u8) -> Option<u8> {
        if self.consecutive_matches > 0 && phase == self.expected_phase {
            self.consecutive_matches += 1;
        } else {
            self.expected_phase = phase;
            self.consecutive_matches = 1;
        }

        if self.expected_phase != 0 && self.consecutive_matches > PHASE_CONFIRMATIONS {
            Some(self.expected_phase)
        } else {
            None
        }
    }

    /// Forget everything observed so far.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Edge count bounds over one diagnostic window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeWindow {
    /// Fewest edges seen on one pulse.
    pub min: u32,
    /// Most edges seen on one pulse.
    pub max: u32,
}

/// Running min/max of edge counts, rolled over every [`EDGE_WINDOW`] steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeStats {
    min: u32,
    max: u32,
    samples: u32,
}

impl Default for EdgeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeStats {
    /// Creates an empty window.
    pub const fn new() -> Self {
        Self {
            min: u32::MAX,
            max: 0,
            samples: 0,
        }
    }

    /// Add one count. Returns the finished window when it fills up.
    pub fn record(&mut self, edges: u32) -> Option<EdgeWindow> {
        self.min = self.min.min(edges);
        self.max = self.max.max(edges);
        self.samples += 1;

        if self.samples >= EDGE_WINDOW {
            let window = EdgeWindow {
                min: self.min,
                max: self.max,
            };
            *self = Self::new();
            Some(window)
        } else {
            None
        }
    }

    /// Bounds of the window so far, if it has any samples.
    pub fn current(&self) -> Option<EdgeWindow> {
        (self.samples > 0).then_some(EdgeWindow {
            min: self.min,
            max: self.max,
        })
    }
}

/// Seconds credited for an edge count.
pub const fn classify_edges(edges: u32) -> u32 {
    match edges {
        0 => 0,
        1..=SINGLE_STEP_MAX_EDGES => 1,
        _ => edges / EDGES_PER_STEP,
    }
}

const fn polarity_for(second: u8, bias: bool) -> Polarity {
    Polarity::from_plus_leading((second % 2 == 1) == bias)
}

// ============================================================================
// Closed loop
// ============================================================================

/// Sensor-driven tracker.
///
/// Polarity is always derived from the corrected second position and a
/// bias bit, so phase corrections can never leave it out of step with the
/// physical parity of the movement.
#[derive(Clone, Debug)]
pub struct HandTracker {
    sec_pos: u8,
    polarity_bias: bool,
    phase: WhitePhaseTracker,
    stats: EdgeStats,
    consecutive_zero: u32,
    stall_limit: u32,
    bias_flips: u32,
    phase_corrections: u32,
}

impl HandTracker {
    /// Creates a tracker at second 0. `stall_limit` is the number of
    /// consecutive zero-edge steps tolerated before reporting a jam.
    pub fn new(stall_limit: u32) -> Self {
        Self {
            sec_pos: 0,
            polarity_bias: false,
            phase: WhitePhaseTracker::new(),
            stats: EdgeStats::new(),
            consecutive_zero: 0,
            stall_limit,
            bias_flips: 0,
            phase_corrections: 0,
        }
    }

    /// Current polarity bias bit.
    pub fn polarity_bias(&self) -> bool {
        self.polarity_bias
    }

    /// White phase state.
    pub fn phase_tracker(&self) -> &WhitePhaseTracker {
        &self.phase
    }

    /// Edge statistics for the current window.
    pub fn edge_stats(&self) -> &EdgeStats {
        &self.stats
    }

    /// Total polarity bias flips since start-up.
    pub fn bias_flips(&self) -> u32 {
        self.bias_flips
    }

    fn flip_bias(&mut self) {
        self.polarity_bias = !self.polarity_bias;
        self.bias_flips += 1;
    }
}

impl PositionTracker for HandTracker {
    fn record(&mut self, obs: SensorObservation) -> TrackerReport {
        let mut report = TrackerReport::default();

        report.window = self.stats.record(obs.edge_count);
        if let Some(w) = report.window {
            info!("edges over last {} steps: min={} max={}", EDGE_WINDOW, w.min, w.max);
        }

        let advanced = classify_edges(obs.edge_count);
        report.advanced = (advanced % 60) as u8;
        self.sec_pos = ((self.sec_pos as u32 + advanced) % 60) as u8;

        if obs.edge_count == 0 {
            let was_jammed = self.is_jammed();
            report.stalled = true;
            self.consecutive_zero += 1;
            if self.consecutive_zero % STALL_FLIP_INTERVAL == 0 {
                self.flip_bias();
                report.bias_flipped = true;
                warn!(
                    "no motion for {} steps, flipping polarity bias",
                    self.consecutive_zero
                );
            }
            if !was_jammed && self.is_jammed() {
                warn!("movement jammed after {} stalled steps", self.consecutive_zero);
            }
        } else {
            if self.is_jammed() {
                info!("movement free again after {} stalled steps", self.consecutive_zero);
            }
            self.consecutive_zero = 0;

            if obs.level {
                if let Some(phase) = self.phase.observe(self.sec_pos % 4) {
                    let from = self.sec_pos;
                    self.sec_pos = (self.sec_pos + 60 - phase) % 60;
                    if phase % 2 == 1 {
                        self.flip_bias();
                        report.bias_flipped = true;
                    }
                    self.phase.reset();
                    self.phase_corrections += 1;
                    report.phase_corrected = Some(phase);
                    info!("white phase {} confirmed, second {} -> {}", phase, from, self.sec_pos);
                }
            }
        }

        report.second = self.sec_pos;
        report.jammed = self.is_jammed();
        debug!(
            "tracker edges={} sec={} bias={} stalls={}",
            obs.edge_count, self.sec_pos, self.polarity_bias as u8, self.consecutive_zero
        );
        report
    }

    fn next_polarity(&self) -> Polarity {
        polarity_for(self.sec_pos, self.polarity_bias)
    }

    fn second_position(&self) -> u8 {
        self.sec_pos
    }

    fn reset_to(&mut self, second: u8) {
        self.sec_pos = second % 60;
        self.polarity_bias = false;
        self.consecutive_zero = 0;
        self.phase.reset();
    }

    fn is_jammed(&self) -> bool {
        self.consecutive_zero > self.stall_limit
    }

    fn consecutive_stalls(&self) -> u32 {
        self.consecutive_zero
    }

    fn phase_corrections(&self) -> u32 {
        self.phase_corrections
    }
}

// ============================================================================
// Open loop
// ============================================================================

/// Tracker for movements without a sensor.
///
/// Every pulse counts as one second and the polarity simply alternates.
#[derive(Clone, Debug, Default)]
pub struct OpenLoopTracker {
    sec_pos: u8,
    polarity: Polarity,
}

impl OpenLoopTracker {
    /// Creates a tracker at second 0.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionTracker for OpenLoopTracker {
    fn record(&mut self, _obs: SensorObservation) -> TrackerReport {
        self.sec_pos = (self.sec_pos + 1) % 60;
        self.polarity = self.polarity.flipped();
        TrackerReport {
            second: self.sec_pos,
            advanced: 1,
            ..TrackerReport::default()
        }
    }

    fn next_polarity(&self) -> Polarity {
        self.polarity
    }

    fn second_position(&self) -> u8 {
        self.sec_pos
    }

    fn reset_to(&mut self, second: u8) {
        self.sec_pos = second % 60;
        self.polarity = polarity_for(self.sec_pos, false);
    }

    fn is_jammed(&self) -> bool {
        false
    }
}
