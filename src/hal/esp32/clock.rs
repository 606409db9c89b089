//! Monotonic clock from the ESP-IDF high-resolution timer.

use crate::traits::Clock;

/// Milliseconds since boot from `esp_timer_get_time()`.
///
/// Used to schedule network syncs and to age network time samples.
///
/// ```ignore
/// use rs_pulseclock::hal::esp32::Esp32Clock;
/// use rs_pulseclock::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_ms();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a clock handle.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // SAFETY: reads the free-running system timer
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
