//! Trait definitions for hardware abstraction, time sources, and display.
//!
//! This module defines the core abstractions that allow rs-pulseclock to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Take its reference time from any battery-backed RTC
//! - Correct drift from network time when available
//!
//! # Submodules
//!
//! - `hardware`: Drive lines, optical sensor, delay, monotonic clock
//! - `time`: Wall-clock time source and RTC chip
//! - `network`: Network time queries
//! - `display`: Status display and user requests
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`DriveLines`]: PLUS/MINUS/ENABLE outputs to the H-bridge
//! - [`PositionSensor`]: Optical edge counter on the second-hand wheel
//! - [`Delay`]: Blocking pulse timing
//! - [`Clock`]: Time source for `no_std` environments
//!
//! # Time
//!
//! - [`TimeSource`]: What the engine reads wall time from and persists
//!   the hands to
//! - [`RtcChip`]: Black-box battery-backed clock underneath
//! - [`NetworkTimeSource`]: Optional drift correction

pub mod display;
pub mod hardware;
pub mod network;
pub mod time;

pub use display::*;
pub use hardware::*;
pub use network::*;
pub use time::*;
