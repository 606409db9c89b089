//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `host`: `std` clock and delay (requires `std` feature)
//! - `embedded`: `embedded-hal` 1.0 adapters (requires `hal` feature)
//! - `esp32`: ESP32 with an H-bridge driven pulse clock (requires `esp32` feature)

pub mod mock;

#[cfg(feature = "std")]
pub mod host;

#[cfg(feature = "hal")]
pub mod embedded;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use mock::*;

#[cfg(feature = "std")]
pub use host::{StdClock, StdDelay};

#[cfg(feature = "esp32")]
pub use esp32::*;
