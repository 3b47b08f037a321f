//! Auxiliary sensor rail sequencing
//!
//! The rail feeds every external sensor. It is switched on for the duration
//! of one acquisition and off again before the radio transmits.

use crate::config::timing;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

/// Switchable power rail
pub struct PowerRail<P: OutputPin> {
    pin: P,
    active_low: bool,
    enabled: bool,
}

impl<P: OutputPin> PowerRail<P> {
    /// Take control of the rail and make sure it starts switched off
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut rail = Self {
            pin,
            active_low,
            enabled: false,
        };
        rail.drive(false);
        rail
    }

    /// Switch the rail on and wait for the peripherals to settle
    ///
    /// The returned guard switches the rail off again when it is dropped.
    /// Holding it borrows the rail, so enables cannot nest.
    pub async fn enable<D: DelayNs>(&mut self, delay: &mut D) -> RailGuard<'_, P> {
        self.drive(true);
        log::debug!("Sensor rail on, settling {} ms", timing::RAIL_SETTLE_MS);
        delay.delay_ms(timing::RAIL_SETTLE_MS).await;
        RailGuard { rail: self }
    }

    /// True while the rail is switched on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn drive(&mut self, on: bool) {
        let _ = if on != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        self.enabled = on;
    }
}

/// Proof that the sensor rail is powered and stable
pub struct RailGuard<'a, P: OutputPin> {
    rail: &'a mut PowerRail<P>,
}

impl<P: OutputPin> RailGuard<'_, P> {
    /// Switch the rail off
    pub fn disable(self) {}
}

impl<P: OutputPin> Drop for RailGuard<'_, P> {
    fn drop(&mut self) {
        self.rail.drive(false);
        log::debug!("Sensor rail off");
    }
}
