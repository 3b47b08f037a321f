//! Resistive voltage divider on an ADC input

use crate::config::calibration;

/// Divider geometry and ADC reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageDivider {
    /// Calibrated ADC reference voltage
    pub vref_v: f32,
    /// Upper resistor (source side) in ohms
    pub r1_ohms: u32,
    /// Lower resistor (ground side) in ohms
    pub r2_ohms: u32,
}

impl VoltageDivider {
    /// Divider on the external voltage input
    pub const fn external() -> Self {
        Self {
            vref_v: calibration::ADC_VREF_V,
            r1_ohms: calibration::DIVIDER_R1_OHMS,
            r2_ohms: calibration::DIVIDER_R2_OHMS,
        }
    }

    /// Voltage at the ADC pin for a raw 12-bit sample
    pub fn pin_volts(&self, raw: u16) -> f32 {
        raw as f32 * (self.vref_v / calibration::ADC_FULL_SCALE)
    }

    /// Source voltage recovered from the divider ratio
    pub fn source_volts(&self, raw: u16) -> f32 {
        let ratio = (self.r1_ohms + self.r2_ohms) as f32 / self.r2_ohms as f32;
        self.pin_volts(raw) * ratio
    }

    /// Source voltage in millivolts, truncated
    pub fn source_millivolts(&self, raw: u16) -> u16 {
        (self.source_volts(raw) * 1000.0) as u16
    }
}

impl Default for VoltageDivider {
    fn default() -> Self {
        Self::external()
    }
}
