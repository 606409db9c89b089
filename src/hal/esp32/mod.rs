//! ESP32 hardware abstraction layer for pulse clocks.
//!
//! This module provides hardware implementations for an ESP32 driving a
//! bipolar clock movement through an H-bridge (e.g. DRV8871 or L298N).
//!
//! # Hardware Configuration
//!
//! - **MCU**: any ESP32 with ESP-IDF support
//! - **Driver**: H-bridge with two direction inputs and an enable input
//! - **Sensor**: reflective optical sensor on the second-hand wheel
//!   (white sector once every four seconds)
//!
//! # Reference Wiring
//!
//! Pins come from the settings file; the reference build uses:
//!
//! | Signal | GPIO |
//! |--------|------|
//! | Plus | 26 |
//! | Minus | 27 |
//! | Enable | 25 |
//! | Sense | 33 |
//!
//! Drive lines go through [`HalDriveLines`](crate::hal::embedded::HalDriveLines)
//! over `PinDriver`s, and pulse timing through
//! [`HalDelay`](crate::hal::embedded::HalDelay) over `esp_idf_hal::delay::Delay`.

mod clock;
mod rtc;
mod sense;

pub use clock::Esp32Clock;
pub use rtc::Esp32Rtc;
pub use sense::Esp32SenseLine;

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;
