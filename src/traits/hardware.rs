//! Hardware abstraction traits for the drive lines, the optical sensor, and timing.
//!
//! This module defines the core hardware interfaces that allow rs-pulseclock
//! to work across different platforms (ESP32, desktop mocks, etc.).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DriveLines`] | The PLUS/MINUS/ENABLE outputs of the H-bridge |
//! | [`PositionSensor`] | Edge counter and level of the optical sense line |
//! | [`Delay`] | Blocking millisecond delay for pulse timing |
//! | [`Clock`] | Monotonic time source for scheduling |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::traits::{DriveLine, DriveLines, Polarity};
//! use rs_pulseclock::hal::MockDriveLines;
//!
//! let mut lines = MockDriveLines::new();
//! let polarity = Polarity::MinusLeading;
//! lines.set(polarity.lead(), true).unwrap();
//! lines.set(DriveLine::Enable, true).unwrap();
//!
//! assert!(lines.level(DriveLine::Minus));
//! assert!(lines.level(DriveLine::Enable));
//! ```

/// One of the three logical outputs to the motor driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DriveLine {
    /// Motor "+" terminal.
    Plus,
    /// Motor "-" terminal.
    Minus,
    /// Driver power gate.
    Enable,
}

impl DriveLine {
    /// Returns the line name as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DriveLine::Plus => "plus",
            DriveLine::Minus => "minus",
            DriveLine::Enable => "enable",
        }
    }
}

/// Which terminal leads the next pulse.
///
/// A pulse-clock movement only advances when each pulse has the opposite
/// polarity to the previous one. The lead terminal is driven high for the
/// whole pulse; the trail terminal is pulled low to drive and high to brake.
///
/// # Default
///
/// Defaults to [`PlusLeading`](Self::PlusLeading).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Polarity {
    /// PLUS is the lead terminal.
    #[default]
    PlusLeading,
    /// MINUS is the lead terminal.
    MinusLeading,
}

impl Polarity {
    /// Polarity from a "plus leads" flag.
    #[inline]
    pub const fn from_plus_leading(plus_leading: bool) -> Self {
        if plus_leading {
            Polarity::PlusLeading
        } else {
            Polarity::MinusLeading
        }
    }

    /// The terminal driven high for the whole pulse.
    #[inline]
    pub const fn lead(self) -> DriveLine {
        match self {
            Polarity::PlusLeading => DriveLine::Plus,
            Polarity::MinusLeading => DriveLine::Minus,
        }
    }

    /// The terminal switched between drive (low) and brake (high).
    #[inline]
    pub const fn trail(self) -> DriveLine {
        match self {
            Polarity::PlusLeading => DriveLine::Minus,
            Polarity::MinusLeading => DriveLine::Plus,
        }
    }

    /// The opposite polarity.
    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Polarity::PlusLeading => Polarity::MinusLeading,
            Polarity::MinusLeading => Polarity::PlusLeading,
        }
    }

    /// Returns the polarity as a short string for logs and displays.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Polarity::PlusLeading => "+",
            Polarity::MinusLeading => "-",
        }
    }
}

/// The three digital outputs wired to the H-bridge.
///
/// # Implementation Notes
///
/// - `set` should take effect immediately; pulse timing is done by the
///   caller with [`Delay`]
/// - There is no read-back: a stuck output is diagnosed through the
///   optical sensor, not here
pub trait DriveLines {
    /// Error type for output operations.
    type Error: core::fmt::Debug;

    /// Drive a line high (`true`) or low (`false`).
    fn set(&mut self, line: DriveLine, high: bool) -> Result<(), Self::Error>;

    /// Convenience method to power the driver down.
    fn disable(&mut self) -> Result<(), Self::Error> {
        self.set(DriveLine::Enable, false)
    }
}

/// A single sense-line reading taken right after a pulse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorObservation {
    /// Edges (rising and falling) seen since the previous observation.
    pub edge_count: u32,
    /// Instantaneous sense-line level; `true` is the white sector.
    pub level: bool,
}

impl SensorObservation {
    /// Creates an observation.
    pub const fn new(edge_count: u32, level: bool) -> Self {
        Self { edge_count, level }
    }
}

/// Optical position sensor on the second-hand wheel.
///
/// Edges are counted asynchronously (normally from an interrupt on both
/// edges of the sense line). Noise filtering is the consumer's job.
pub trait PositionSensor {
    /// Returns edges counted since the last call and resets the counter.
    ///
    /// Must be atomic with respect to the edge interrupt.
    fn consume_count(&mut self) -> u32;

    /// Returns the instantaneous level of the sense line.
    fn current_level(&self) -> bool;

    /// Reads and resets the count, then samples the level.
    fn observe(&mut self) -> SensorObservation {
        let edge_count = self.consume_count();
        SensorObservation {
            edge_count,
            level: self.current_level(),
        }
    }
}

/// Blocking millisecond delay used to time pulses.
///
/// Pulses are timing-critical and short (well under a second), so they
/// run to completion on the calling thread.
pub trait Delay {
    /// Block for the given number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for scheduling network time
/// queries. On desktop, this can wrap `std::time::Instant`. On embedded,
/// use a hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_pulseclock::traits::Clock;
/// use rs_pulseclock::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
