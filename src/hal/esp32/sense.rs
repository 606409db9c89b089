//! Optical sense line with an any-edge GPIO interrupt.
//!
//! The interrupt handler does nothing but bump a static [`EdgeCounter`];
//! the stepping loop takes the count once per pulse.

use core::ffi::c_void;

use esp_idf_hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::{
    esp, esp_err_t, gpio_install_isr_service, gpio_int_type_t_GPIO_INTR_ANYEDGE, gpio_intr_enable,
    gpio_isr_handler_add, gpio_isr_handler_remove, gpio_set_intr_type, EspError,
    ESP_ERR_INVALID_STATE,
};
use log::info;

use crate::sensor::EdgeCounter;
use crate::traits::PositionSensor;

unsafe extern "C" fn edge_isr(arg: *mut c_void) {
    // SAFETY: `arg` is the `&'static EdgeCounter` registered in `Esp32SenseLine::new`
    let counter = unsafe { &*(arg as *const EdgeCounter) };
    counter.record_edge();
}

/// Sense input counting both edges into a static counter.
///
/// # Example
///
/// ```ignore
/// use rs_pulseclock::hal::esp32::Esp32SenseLine;
/// use rs_pulseclock::EdgeCounter;
///
/// static EDGES: EdgeCounter = EdgeCounter::new();
///
/// let sensor = Esp32SenseLine::new(peripherals.pins.gpio33, &EDGES)?;
/// ```
pub struct Esp32SenseLine<'d, P>
where
    P: InputPin + OutputPin,
{
    pin: PinDriver<'d, P, Input>,
    counter: &'static EdgeCounter,
}

impl<'d, P> Esp32SenseLine<'d, P>
where
    P: InputPin + OutputPin,
{
    /// Configure the pin as an input and attach the edge interrupt.
    ///
    /// # Errors
    ///
    /// Returns an error if GPIO or interrupt setup fails.
    pub fn new(
        pin: impl Peripheral<P = P> + 'd,
        counter: &'static EdgeCounter,
    ) -> Result<Self, EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Floating)?;
        let gpio = pin.pin();

        // SAFETY: plain register setup; the handler argument outlives the
        // registration because the counter is 'static
        unsafe {
            match esp!(gpio_install_isr_service(0)) {
                Err(e) if e.code() == ESP_ERR_INVALID_STATE as esp_err_t => {} // already installed
                other => other?,
            }
            esp!(gpio_set_intr_type(gpio, gpio_int_type_t_GPIO_INTR_ANYEDGE))?;
            esp!(gpio_isr_handler_add(
                gpio,
                Some(edge_isr),
                counter as *const EdgeCounter as *mut c_void,
            ))?;
            esp!(gpio_intr_enable(gpio))?;
        }
        counter.consume();
        info!("sense line on GPIO{}", gpio);

        Ok(Self { pin, counter })
    }

    /// The shared edge counter.
    pub fn counter(&self) -> &'static EdgeCounter {
        self.counter
    }
}

impl<P> PositionSensor for Esp32SenseLine<'_, P>
where
    P: InputPin + OutputPin,
{
    fn consume_count(&mut self) -> u32 {
        self.counter.consume()
    }

    fn current_level(&self) -> bool {
        self.pin.is_high()
    }
}

impl<P> Drop for Esp32SenseLine<'_, P>
where
    P: InputPin + OutputPin,
{
    fn drop(&mut self) {
        // SAFETY: removes the handler registered in `new`
        unsafe {
            gpio_isr_handler_remove(self.pin.pin());
        }
    }
}
