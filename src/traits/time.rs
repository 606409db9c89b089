//! Wall-clock time and hand-position persistence.
//!
//! [`TimeSource`] is what the stepping engine sees: current time of day,
//! whether that time has recently been corroborated by network time, and a
//! non-volatile slot holding the hand position. [`RtcChip`] is the
//! battery-backed clock chip underneath, treated as a black box; its
//! register encoding is the implementor's business.

use crate::position::HmsTriple;

/// Reference time plus hand-position storage, as used by the engine.
///
/// # Implementation Notes
///
/// - `now` should be cheap; it is called on every engine tick
/// - `set_persisted_hand_position` is called after every step, so the
///   backing store must tolerate frequent writes
pub trait TimeSource {
    /// Error type for time source operations.
    type Error: core::fmt::Debug;

    /// Current local time of day.
    fn now(&mut self) -> Result<HmsTriple, Self::Error>;

    /// True if the time was recently corroborated by network time.
    fn is_synced(&self) -> bool;

    /// Store where the hands point.
    fn set_persisted_hand_position(&mut self, hands: HmsTriple) -> Result<(), Self::Error>;

    /// Read back the stored hand position.
    fn persisted_hand_position(&mut self) -> Result<HmsTriple, Self::Error>;
}

/// Battery-backed real-time clock with one spare register for the hands.
///
/// On a DS3231 the hand position lives in the alarm-1 registers; other
/// chips can use any battery-backed scratch area.
pub trait RtcChip {
    /// Error type for bus/register access.
    type Error: core::fmt::Debug;

    /// Read the chip's time of day.
    fn read_time(&mut self) -> Result<HmsTriple, Self::Error>;

    /// Set the chip's time of day.
    fn write_time(&mut self, time: HmsTriple) -> Result<(), Self::Error>;

    /// Read the hand-position register.
    fn read_hands(&mut self) -> Result<HmsTriple, Self::Error>;

    /// Write the hand-position register.
    fn write_hands(&mut self, hands: HmsTriple) -> Result<(), Self::Error>;
}
