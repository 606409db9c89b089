//! Pulse sequences for the H-bridge driving the clock movement.
//!
//! [`PulseDriver`] owns the three drive lines, the blocking delay used to
//! time them, and the optical sensor that is read once when each sequence
//! completes. It never chooses a polarity itself; the caller passes the
//! polarity the [tracker](crate::tracker) asks for.
//!
//! # Sequences
//!
//! | Sequence | Shape |
//! |----------|-------|
//! | [`step`](PulseDriver::step) | `pulse_count` x (drive `pulse`, brake `dwell`), settle `stop`, power down, `recover` |
//! | [`fast_step`](PulseDriver::fast_step) | drive `fast_pulse1`, brake `fast_dwell`, drive `fast_pulse2`, brake `fast_stop`, power down |
//!
//! "Drive" pulls the trail terminal low with the lead terminal high and
//! the driver enabled; "brake" pulls the trail terminal back high so both
//! terminals sit at the same level.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::config::PulseConfig;
//! use rs_pulseclock::driver::PulseDriver;
//! use rs_pulseclock::hal::{MockDelay, MockDriveLines, MockSensor};
//! use rs_pulseclock::traits::{DriveLine, Polarity, SensorObservation};
//!
//! let pulse = PulseConfig {
//!     pulse_ms: 100, dwell_ms: 50, stop_ms: 50, recover_ms: 100, pulse_count: 2,
//!     fast_pulse1_ms: 60, fast_dwell_ms: 30, fast_pulse2_ms: 30, fast_stop_ms: 60,
//! };
//! let mut sensor = MockSensor::new();
//! sensor.queue(SensorObservation::new(6, false));
//!
//! let mut driver = PulseDriver::new(MockDriveLines::new(), MockDelay::new(), sensor, pulse);
//! let obs = driver.step(Polarity::PlusLeading).unwrap();
//!
//! assert_eq!(obs.edge_count, 6);
//! assert_eq!(driver.delay().total_ms, 500);
//! assert!(!driver.lines().level(DriveLine::Enable));
//! ```

use log::debug;

use crate::config::PulseConfig;
use crate::traits::{Delay, DriveLine, DriveLines, Polarity, PositionSensor, SensorObservation};

/// Issues timed pulse sequences and reads the sensor once per sequence.
///
/// # Type Parameters
///
/// - `L`: drive line outputs ([`DriveLines`])
/// - `D`: blocking delay ([`Delay`])
/// - `S`: optical sensor ([`PositionSensor`])
pub struct PulseDriver<L: DriveLines, D: Delay, S: PositionSensor> {
    lines: L,
    delay: D,
    sensor: S,
    config: PulseConfig,
}

impl<L: DriveLines, D: Delay, S: PositionSensor> PulseDriver<L, D, S> {
    /// Create a driver. The lines are not touched until the first pulse.
    pub fn new(lines: L, delay: D, sensor: S, config: PulseConfig) -> Self {
        Self {
            lines,
            delay,
            sensor,
            config,
        }
    }

    /// Issue one normal step.
    ///
    /// Any edges counted before the sequence started are credited to this
    /// step; the count is read exactly once, after the recovery delay.
    pub fn step(&mut self, polarity: Polarity) -> Result<SensorObservation, L::Error> {
        if let Err(e) = self.run_step(polarity) {
            self.abort();
            return Err(e);
        }
        let obs = self.sensor.observe();
        debug!(
            "step {} edges={} level={}",
            polarity.as_str(),
            obs.edge_count,
            obs.level as u8
        );
        Ok(obs)
    }

    /// Issue one fast step.
    ///
    /// Draws more current than [`step`](Self::step); callers only use it
    /// while the hands are behind.
    pub fn fast_step(&mut self, polarity: Polarity) -> Result<SensorObservation, L::Error> {
        if let Err(e) = self.run_fast_step(polarity) {
            self.abort();
            return Err(e);
        }
        let obs = self.sensor.observe();
        debug!(
            "fast step {} edges={} level={}",
            polarity.as_str(),
            obs.edge_count,
            obs.level as u8
        );
        Ok(obs)
    }

    /// Power down after a failed line write and drop the edges the aborted
    /// sequence produced, so they are not credited to the next step.
    fn abort(&mut self) {
        let _ = self.lines.disable();
        let dropped = self.sensor.consume_count();
        if dropped > 0 {
            debug!("aborted pulse discarded {} edges", dropped);
        }
    }

    fn run_step(&mut self, polarity: Polarity) -> Result<(), L::Error> {
        let (lead, trail) = (polarity.lead(), polarity.trail());
        let c = self.config;

        self.lines.disable()?;
        self.lines.set(lead, true)?;
        for _ in 0..c.pulse_count {
            self.lines.set(trail, false)?;
            self.lines.set(DriveLine::Enable, true)?;
            self.delay.delay_ms(c.pulse_ms);
            self.lines.set(trail, true)?;
            self.delay.delay_ms(c.dwell_ms);
        }
        self.delay.delay_ms(c.stop_ms);
        self.lines.disable()?;
        self.delay.delay_ms(c.recover_ms);
        Ok(())
    }

    fn run_fast_step(&mut self, polarity: Polarity) -> Result<(), L::Error> {
        let (lead, trail) = (polarity.lead(), polarity.trail());
        let c = self.config;

        self.lines.disable()?;
        self.lines.set(lead, true)?;
        self.lines.set(trail, false)?;
        self.lines.set(DriveLine::Enable, true)?;
        self.delay.delay_ms(c.fast_pulse1_ms);
        self.lines.set(trail, true)?;
        self.delay.delay_ms(c.fast_dwell_ms);
        self.lines.set(trail, false)?;
        self.delay.delay_ms(c.fast_pulse2_ms);
        self.lines.set(trail, true)?;
        self.delay.delay_ms(c.fast_stop_ms);
        self.lines.disable()?;
        Ok(())
    }

    /// Power the driver down outside of a sequence.
    pub fn disable(&mut self) -> Result<(), L::Error> {
        self.lines.disable()
    }

    /// Duration of one normal step in milliseconds.
    pub fn step_duration_ms(&self) -> u32 {
        self.config.step_duration_ms()
    }

    /// Duration of one fast step in milliseconds.
    pub fn fast_step_duration_ms(&self) -> u32 {
        self.config.fast_step_duration_ms()
    }

    /// The pulse timings in use.
    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// The drive lines.
    pub fn lines(&self) -> &L {
        &self.lines
    }

    /// The delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// The delay provider, mutably. The engine uses it for idle sleeps.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// The sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// The sensor, mutably.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Take the driver apart.
    pub fn into_parts(self) -> (L, D, S) {
        (self.lines, self.delay, self.sensor)
    }
}
