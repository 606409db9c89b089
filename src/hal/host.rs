//! Hosted (`std`) clock and delay, for desktop runs and the NTP client.

use std::thread;
use std::time::{Duration, Instant};

use crate::traits::{Clock, Delay};

/// Monotonic clock backed by `std::time::Instant`.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    /// Starts counting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Delay backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_ms();
        StdDelay.delay_ms(5);
        let b = clock.now_ms();
        assert!(b >= a + 5);
    }
}
