//! Sensor collaborator traits for abstraction and testability
//!
//! Digital pins and delays come from `embedded-hal`. The ADC, the
//! environmental sensor, the battery gauge and the microsecond clock have no
//! common HAL trait, so they are defined here and implemented per board.

use crate::telemetry::EnvironmentSample;

/// Errors reported by sensor collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Device did not answer on the bus
    NotResponding,
    /// Bus transfer failed
    Bus,
    /// Device answered with an out-of-range value
    InvalidData,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorError::NotResponding => write!(f, "sensor not responding"),
            SensorError::Bus => write!(f, "sensor bus error"),
            SensorError::InvalidData => write!(f, "sensor returned invalid data"),
        }
    }
}

/// Temperature, humidity and pressure sensor (BME280 on the reference board)
pub trait EnvironmentSensor {
    /// Bring the chip up after the rail has been powered
    fn init(&mut self) -> Result<(), SensorError>;

    /// Take one measurement
    fn measure(&mut self) -> Result<EnvironmentSample, SensorError>;
}

/// A single 12-bit ADC input
pub trait AdcChannel {
    /// Read a raw sample (0-4095)
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Battery gauge provided by the board
pub trait BatteryGauge {
    /// Battery voltage in millivolts
    fn voltage_mv(&mut self) -> i16;

    /// Raw charge level: 0 on external power, 1-254 from empty to full
    fn level_raw(&mut self) -> u8;
}

/// Free-running microsecond clock
pub trait MicrosClock {
    fn now_us(&self) -> u64;
}
