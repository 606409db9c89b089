//! Display abstraction for clock status.
//!
//! This module defines the [`ClockDisplay`] trait. The display receives a
//! [`ClockState`] each tick and may hand back user requests (for example
//! "the hands now show the current time") for the engine to apply.

use crate::engine::{ClockState, UserRequest};

/// Display/UI trait for clock status.
///
/// Implementors provide hardware-specific rendering for screens like a
/// TFT panel or an OLED, or a simulated display for testing.
///
/// # Example
///
/// ```ignore
/// use rs_pulseclock::traits::ClockDisplay;
/// use rs_pulseclock::ClockState;
///
/// struct MyDisplay { /* ... */ }
///
/// impl ClockDisplay for MyDisplay {
///     type Error = ();
///
///     fn init(&mut self) -> Result<(), ()> { Ok(()) }
///     fn render(&mut self, state: &ClockState) -> Result<(), ()> {
///         // Wall time, hand position, mode, sync status...
///         Ok(())
///     }
///     fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), ()> {
///         Ok(())
///     }
/// }
/// ```
pub trait ClockDisplay {
    /// Error type for display operations.
    type Error;

    /// Initializes the display hardware. Called once at startup.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Renders the current clock state.
    ///
    /// Implementations should show the wall-clock time, where the hands
    /// point, the [`ClockMode`](crate::ClockMode), and network sync status.
    fn render(&mut self, state: &ClockState) -> Result<(), Self::Error>;

    /// Shows a simple message (e.g., for startup or errors).
    fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), Self::Error>;

    /// Returns the next pending user request, if any.
    ///
    /// Default implementation never produces requests.
    fn take_request(&mut self) -> Option<UserRequest> {
        None
    }
}
