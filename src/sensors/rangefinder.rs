//! Ultrasonic rangefinder (JSN-SR04T style trigger/echo)

use crate::config::ultrasonic;
use crate::sensors::poll::poll_until;
use crate::sensors::traits::MicrosClock;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Errors from a distance measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// Echo edge not seen within the timeout
    NoEcho,
}

impl core::fmt::Display for RangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RangeError::NoEcho => write!(f, "no ultrasonic echo"),
        }
    }
}

/// Convert an echo pulse width to centimetres (us * 0.034 / 2, truncated)
pub fn echo_to_cm(echo_us: u64) -> u16 {
    let cm = echo_us * ultrasonic::CM_PER_MS_ROUND_TRIP as u64 / 1000;
    cm.min(u16::MAX as u64) as u16
}

/// Trigger/echo rangefinder
pub struct Rangefinder<Trig, Echo, Clock>
where
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
{
    trigger: Trig,
    echo: Echo,
    clock: Clock,
}

impl<Trig, Echo, Clock> Rangefinder<Trig, Echo, Clock>
where
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
{
    pub fn new(trigger: Trig, echo: Echo, clock: Clock) -> Self {
        Self {
            trigger,
            echo,
            clock,
        }
    }

    /// Fire one ping and time the echo
    ///
    /// Blocks for at most two echo timeouts (60 ms).
    pub fn measure<D: DelayNs>(&mut self, delay: &mut D) -> Result<u16, RangeError> {
        self.fire(delay);

        // A pin read error counts as "edge not seen" and ends as NoEcho
        let echo = &mut self.echo;
        let rise = poll_until(
            &self.clock,
            delay,
            ultrasonic::ECHO_TIMEOUT_US,
            ultrasonic::ECHO_POLL_STEP_US,
            || echo.is_high().unwrap_or(false),
        )
        .map_err(|_| RangeError::NoEcho)?;

        let fall = poll_until(
            &self.clock,
            delay,
            ultrasonic::ECHO_TIMEOUT_US,
            ultrasonic::ECHO_POLL_STEP_US,
            || echo.is_low().unwrap_or(false),
        )
        .map_err(|_| RangeError::NoEcho)?;

        Ok(echo_to_cm(fall - rise))
    }

    /// Emit the trigger pulse
    ///
    /// Pin errors are ignored; a pulse that never left the pin shows up as
    /// NoEcho.
    fn fire<D: DelayNs>(&mut self, delay: &mut D) {
        let _ = self.trigger.set_low();
        delay.delay_us(ultrasonic::TRIGGER_PRELOW_US);
        let _ = self.trigger.set_high();
        delay.delay_us(ultrasonic::TRIGGER_PULSE_US);
        let _ = self.trigger.set_low();
    }
}
