//! Hand positions and hour/minute/second triples.
//!
//! A [`HandPosition`] is the number of seconds the hands show past 12:00:00,
//! always reduced modulo [`HALF_DAY_SECS`]. An [`HmsTriple`] is the form in
//! which positions are persisted and in which wall-clock time arrives from
//! the time source.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::{HandPosition, HmsTriple};
//!
//! let hands = HandPosition::from_hms(11, 59, 59);
//! assert_eq!(hands.advance(), HandPosition::new(0));
//!
//! // 13:05:00 on a 24-hour clock shows as 1:05 on the dial
//! let wall = HandPosition::from_triple(HmsTriple::new(13, 5, 0));
//! assert_eq!(wall.hour(), 1);
//! assert_eq!(wall.minute(), 5);
//! ```

use crate::error::ClockError;

/// Seconds in one full revolution of the hour hand.
pub const HALF_DAY_SECS: u32 = 43_200;

const DAY_SECS: u64 = 86_400;

/// Where the hands point, in seconds since 12:00:00.
///
/// The inner value is always in `0..HALF_DAY_SECS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u32"))]
pub struct HandPosition(u32);

impl From<u32> for HandPosition {
    fn from(secs: u32) -> Self {
        Self::new(secs)
    }
}

impl HandPosition {
    /// Creates a position, wrapping onto the 12-hour dial.
    #[inline]
    pub const fn new(secs: u32) -> Self {
        Self(secs % HALF_DAY_SECS)
    }

    /// Creates a position from hour/minute/second. Hours wrap at 12.
    pub const fn from_hms(hour: u8, minute: u8, second: u8) -> Self {
        Self::new(hour as u32 * 3600 + minute as u32 * 60 + second as u32)
    }

    /// Maps a persisted or wall-clock triple onto the dial.
    pub const fn from_triple(t: HmsTriple) -> Self {
        Self::from_hms(t.hour, t.minute, t.second)
    }

    /// Encodes the position as a triple with the hour in `0..12`.
    pub const fn to_triple(self) -> HmsTriple {
        HmsTriple {
            hour: self.hour(),
            minute: self.minute(),
            second: self.second(),
        }
    }

    /// Seconds past 12:00:00.
    #[inline]
    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Hour shown on the dial (`0..12`).
    #[inline]
    pub const fn hour(self) -> u8 {
        (self.0 / 3600) as u8
    }

    /// Minute shown on the dial.
    #[inline]
    pub const fn minute(self) -> u8 {
        ((self.0 / 60) % 60) as u8
    }

    /// Second hand position (`0..60`).
    #[inline]
    pub const fn second(self) -> u8 {
        (self.0 % 60) as u8
    }

    /// The position one step later.
    #[inline]
    pub const fn advance(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// Moves the position by a signed number of seconds, wrapping both ways.
    pub fn offset_by(self, delta: i32) -> Self {
        let wrapped = (self.0 as i64 + delta as i64).rem_euclid(HALF_DAY_SECS as i64);
        Self(wrapped as u32)
    }

    /// Seconds the hands must move forward to show `wanted`, in
    /// `0..HALF_DAY_SECS`.
    #[inline]
    pub const fn gap_to(self, wanted: HandPosition) -> u32 {
        (wanted.0 + HALF_DAY_SECS - self.0) % HALF_DAY_SECS
    }
}

/// Hour (0-23), minute and second.
///
/// Used both for wall-clock time of day and for the persisted hand position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HmsTriple {
    /// Hour, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second, 0-59.
    pub second: u8,
}

impl HmsTriple {
    /// Creates a triple without validation.
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// Returns the triple if every field is in range.
    ///
    /// Battery-backed registers can hold garbage after a brown-out, so
    /// persisted positions are validated before use.
    pub fn validate(self) -> Result<Self, ClockError> {
        if self.hour < 24 && self.minute < 60 && self.second < 60 {
            Ok(self)
        } else {
            Err(ClockError::InvalidPersistedPosition)
        }
    }

    /// Seconds since midnight.
    pub const fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    /// Time of day for a Unix timestamp, shifted by a local UTC offset.
    pub fn from_epoch_secs(epoch_secs: u64, utc_offset_secs: i32) -> Self {
        let local = (epoch_secs as i64 + utc_offset_secs as i64).rem_euclid(DAY_SECS as i64) as u32;
        Self::new((local / 3600) as u8, ((local / 60) % 60) as u8, (local % 60) as u8)
    }
}

impl core::fmt::Display for HmsTriple {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl core::fmt::Display for HandPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:2}:{:02}:{:02}", self.hour(), self.minute(), self.second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wraps_onto_dial() {
        assert_eq!(HandPosition::new(43_200).as_secs(), 0);
        assert_eq!(HandPosition::new(43_201).as_secs(), 1);
        assert_eq!(HandPosition::new(u32::MAX).as_secs(), u32::MAX % HALF_DAY_SECS);
    }

    #[test]
    fn advance_wraps_at_twelve() {
        let last = HandPosition::new(43_199);
        assert_eq!(last.advance().as_secs(), 0);
    }

    #[test]
    fn afternoon_hours_fold_onto_dial() {
        let t = HmsTriple::new(23, 59, 59);
        assert_eq!(HandPosition::from_triple(t).as_secs(), 43_199);
        assert_eq!(HandPosition::from_triple(HmsTriple::new(12, 0, 0)).as_secs(), 0);
    }

    #[test]
    fn triple_round_trip_is_identity_on_dial() {
        for secs in (0..HALF_DAY_SECS).step_by(7) {
            let pos = HandPosition::new(secs);
            assert_eq!(HandPosition::from_triple(pos.to_triple()), pos);
        }
    }

    #[test]
    fn gap_is_always_in_range() {
        for wanted in (0..HALF_DAY_SECS).step_by(997) {
            for shown in (0..HALF_DAY_SECS).step_by(1009) {
                let gap = HandPosition::new(shown).gap_to(HandPosition::new(wanted));
                assert!(gap < HALF_DAY_SECS);
                assert_eq!((shown + gap) % HALF_DAY_SECS, wanted);
            }
        }
    }

    #[test]
    fn gap_across_wrap() {
        let shown = HandPosition::new(43_199);
        assert_eq!(shown.gap_to(HandPosition::new(0)), 1);
        assert_eq!(HandPosition::new(0).gap_to(HandPosition::new(43_199)), 43_199);
    }

    #[test]
    fn offset_by_wraps_both_directions() {
        assert_eq!(HandPosition::new(0).offset_by(-1).as_secs(), 43_199);
        assert_eq!(HandPosition::new(43_199).offset_by(2).as_secs(), 1);
        assert_eq!(HandPosition::new(100).offset_by(-30).as_secs(), 70);
    }

    #[test]
    fn accessors() {
        let pos = HandPosition::from_hms(7, 42, 13);
        assert_eq!(pos.hour(), 7);
        assert_eq!(pos.minute(), 42);
        assert_eq!(pos.second(), 13);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(HmsTriple::new(23, 59, 59).validate().is_ok());
        assert_eq!(
            HmsTriple::new(24, 0, 0).validate(),
            Err(ClockError::InvalidPersistedPosition)
        );
        assert!(HmsTriple::new(0, 60, 0).validate().is_err());
        assert!(HmsTriple::new(0, 0, 60).validate().is_err());
    }

    #[test]
    fn from_epoch_applies_offset() {
        // 2021-01-01T00:00:00Z
        let epoch = 1_609_459_200;
        assert_eq!(HmsTriple::from_epoch_secs(epoch, 0), HmsTriple::new(0, 0, 0));
        assert_eq!(HmsTriple::from_epoch_secs(epoch, 3600), HmsTriple::new(1, 0, 0));
        assert_eq!(HmsTriple::from_epoch_secs(epoch, -60), HmsTriple::new(23, 59, 0));
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", HmsTriple::new(9, 5, 3)), "09:05:03");
        assert_eq!(format!("{}", HandPosition::from_hms(9, 5, 3)), " 9:05:03");
    }

    #[cfg(feature = "json")]
    #[test]
    fn deserialize_wraps_onto_dial() {
        let p: HandPosition = serde_json::from_str("43205").unwrap();
        assert_eq!(p, HandPosition::new(5));
        assert_eq!(serde_json::to_string(&p).unwrap(), "5");
    }
}
