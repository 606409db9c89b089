//! Interrupt-safe edge counting for the optical sense line.
//!
//! The sense-line interrupt fires on both edges and calls
//! [`EdgeCounter::record_edge`]; the stepping loop takes the count once per
//! pulse with [`EdgeCounter::consume`]. Both are single atomic operations,
//! so an edge arriving mid-read lands either in this step's count or the
//! next one, never in neither.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::sensor::{EdgeCounter, CountedSenseLine};
//! use rs_pulseclock::traits::PositionSensor;
//!
//! static EDGES: EdgeCounter = EdgeCounter::new();
//!
//! // From the interrupt handler:
//! EDGES.record_edge();
//! EDGES.record_edge();
//!
//! let mut sensor = CountedSenseLine::new(&EDGES, || true);
//! let obs = sensor.observe();
//! assert_eq!(obs.edge_count, 2);
//! assert!(obs.level);
//! assert_eq!(EDGES.peek(), 0);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use crate::traits::PositionSensor;

/// Lock-free edge counter shared between an ISR and the main loop.
#[derive(Debug, Default)]
pub struct EdgeCounter {
    count: AtomicU32,
}

impl EdgeCounter {
    /// Creates a counter at zero. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Count one edge. Safe to call from interrupt context.
    #[inline]
    pub fn record_edge(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically read the count and reset it to zero.
    #[inline]
    pub fn consume(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Read the count without resetting it.
    #[inline]
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

/// A [`PositionSensor`] built from a shared [`EdgeCounter`] and a level reader.
///
/// The level reader is typically a closure over the input pin driver.
pub struct CountedSenseLine<'a, L> {
    counter: &'a EdgeCounter,
    level: L,
}

impl<'a, L: Fn() -> bool> CountedSenseLine<'a, L> {
    /// Pairs a counter with a level reader.
    pub fn new(counter: &'a EdgeCounter, level: L) -> Self {
        Self { counter, level }
    }

    /// The underlying counter.
    pub fn counter(&self) -> &'a EdgeCounter {
        self.counter
    }
}

impl<L: Fn() -> bool> PositionSensor for CountedSenseLine<'_, L> {
    fn consume_count(&mut self) -> u32 {
        self.counter.consume()
    }

    fn current_level(&self) -> bool {
        (self.level)()
    }
}
