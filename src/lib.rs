//! # rs-pulseclock
//!
//! A closed-loop driver for bipolar pulse ("slave") clocks: mechanical
//! movements that advance one second per electrical pulse of alternating
//! polarity.
//!
//! ## Features
//!
//! - **Pulse sequences**: multi-pulse steps with active braking and a
//!   faster catch-up profile, timed from a settings file
//! - **Closed-loop tracking**: an optical sensor on the second-hand wheel
//!   catches missed and doubled steps, stalls, and drift of the four-second
//!   white pattern
//! - **Run / Wait / Fast**: hands catch up when behind and park when
//!   slightly ahead rather than lapping the dial
//! - **Persistent hands**: the hand position is written through to
//!   battery-backed storage after every step
//! - **Network time**: optional NTP drift correction for the RTC
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, time and network abstractions
//! - `driver` - Pulse sequences on the H-bridge
//! - `tracker` - Second-hand position from sensor edges
//! - `engine` - Per-tick Run/Wait/Fast decisions
//! - `sync` - Network time correction and scheduling
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_pulseclock::{
//!     ClockEngine, ClockMode, HmsTriple,
//!     config::{EngineConfig, PulseConfig},
//!     driver::PulseDriver,
//!     hal::{MockDelay, MockDriveLines, MockSensor, MockTimeSource},
//!     tracker::HandTracker,
//!     traits::SensorObservation,
//! };
//!
//! let pulse = PulseConfig {
//!     pulse_ms: 100, dwell_ms: 50, stop_ms: 50, recover_ms: 100, pulse_count: 2,
//!     fast_pulse1_ms: 60, fast_dwell_ms: 30, fast_pulse2_ms: 30, fast_stop_ms: 60,
//! };
//! // Every pulse produces a handful of edges: the hand moved one second
//! let sensor = MockSensor::new().with_default(SensorObservation::new(6, false));
//! let driver = PulseDriver::new(MockDriveLines::new(), MockDelay::new(), sensor, pulse);
//! let config = EngineConfig::default();
//! let mut engine = ClockEngine::new(driver, HandTracker::new(config.stall_limit), config);
//!
//! // Hands stopped at 10:00:00, it is now 10:00:05
//! let mut time = MockTimeSource::new(HmsTriple::new(10, 0, 5), HmsTriple::new(10, 0, 0));
//! engine.start(&mut time).unwrap();
//!
//! // Main loop: tick, and idle when nothing was pulsed
//! while engine.hands().to_triple() != time.now {
//!     let outcome = engine.tick(&mut time).unwrap();
//!     if !outcome.stepped() {
//!         engine.idle();
//!     }
//! }
//! assert_eq!(engine.mode(), ClockMode::Run);
//! assert_eq!(time.persisted, HmsTriple::new(10, 0, 5));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Pulse sequences for the H-bridge.
pub mod driver;
/// Per-tick stepping decisions.
pub mod engine;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// SNTP packet codec and client.
pub mod ntp;
/// Hand positions and time-of-day triples.
pub mod position;
/// Interrupt-safe edge counting.
pub mod sensor;
/// Network time correction and scheduling.
pub mod sync;
/// Second-hand position tracking.
pub mod tracker;
/// Core traits for hardware, time and network abstraction.
pub mod traits;

// Re-exports for convenience
pub use driver::PulseDriver;
pub use engine::{
    decide, ClockEngine, ClockFault, ClockMode, ClockState, Decision, StepAction, TickOutcome,
    UserRequest,
};
pub use error::{ClockError, ConfigError, NtpError};
pub use position::{HandPosition, HmsTriple, HALF_DAY_SECS};
pub use sensor::{CountedSenseLine, EdgeCounter};
pub use sync::{SyncScheduler, SyncedTimeSource};
pub use tracker::{HandTracker, OpenLoopTracker, PositionTracker, TrackerReport};
pub use traits::{
    // Hardware
    Clock,
    // Display
    ClockDisplay,
    Delay,
    DriveLine,
    DriveLines,
    // Network
    NetworkTimeSource,
    NtpSample,
    Polarity,
    PositionSensor,
    // Time
    RtcChip,
    SensorObservation,
    TimeSource,
};

// Config re-exports
pub use config::{
    ClockSettings, Config, DeviceConfig, EngineConfig, NtpConfig, PinConfig, PulseConfig,
    WifiConfig,
};
