//! Adapters from `embedded-hal` 1.0 to the drive and delay traits.
//!
//! Any HAL that provides `OutputPin` and `DelayNs` (esp-idf-hal, rp-hal,
//! stm32 HALs...) can drive a movement through these.
//!
//! ```ignore
//! use esp_idf_hal::delay::Delay;
//! use esp_idf_hal::gpio::PinDriver;
//! use rs_pulseclock::hal::embedded::{HalDelay, HalDriveLines};
//!
//! let lines = HalDriveLines::new(
//!     PinDriver::output(plus)?,
//!     PinDriver::output(minus)?,
//!     PinDriver::output(enable)?,
//! );
//! let delay = HalDelay::new(Delay::new_default());
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::traits::{Delay, DriveLine, DriveLines};

/// Three `OutputPin`s wired to the H-bridge.
pub struct HalDriveLines<P: OutputPin> {
    plus: P,
    minus: P,
    enable: P,
}

impl<P: OutputPin> HalDriveLines<P> {
    /// Wrap the plus, minus and enable pins.
    pub fn new(plus: P, minus: P, enable: P) -> Self {
        Self {
            plus,
            minus,
            enable,
        }
    }

    /// Give the pins back.
    pub fn release(self) -> (P, P, P) {
        (self.plus, self.minus, self.enable)
    }
}

impl<P: OutputPin> DriveLines for HalDriveLines<P> {
    type Error = P::Error;

    fn set(&mut self, line: DriveLine, high: bool) -> Result<(), P::Error> {
        let pin = match line {
            DriveLine::Plus => &mut self.plus,
            DriveLine::Minus => &mut self.minus,
            DriveLine::Enable => &mut self.enable,
        };
        if high {
            pin.set_high()
        } else {
            pin.set_low()
        }
    }
}

/// Any `DelayNs` as a millisecond [`Delay`].
pub struct HalDelay<D: DelayNs>(D);

impl<D: DelayNs> HalDelay<D> {
    /// Wrap a delay provider.
    pub fn new(delay: D) -> Self {
        Self(delay)
    }
}

impl<D: DelayNs> Delay for HalDelay<D> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct Pin {
        high: bool,
    }

    impl ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ns += ns as u64;
        }
    }

    #[test]
    fn lines_map_to_pins() {
        let mut lines = HalDriveLines::new(Pin::default(), Pin::default(), Pin::default());
        lines.set(DriveLine::Minus, true).unwrap();
        lines.set(DriveLine::Enable, true).unwrap();
        lines.disable().unwrap();

        let (plus, minus, enable) = lines.release();
        assert!(!plus.high);
        assert!(minus.high);
        assert!(!enable.high);
    }

    #[test]
    fn delay_in_milliseconds() {
        let mut delay = HalDelay::new(CountingDelay::default());
        delay.delay_ms(3);
        assert_eq!(delay.0.ns, 3_000_000);
    }
}
