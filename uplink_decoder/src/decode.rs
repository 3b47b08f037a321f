//! Hex input parsing and field rendering.

use anyhow::{bail, Context};
use sensor_node_firmware::telemetry::SensorReading;

/// Parse hex as printed by a receiver.
///
/// Accepts an optional `0x` prefix and spaces, colons or dashes between bytes.
pub fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-' | '\t'))
        .collect();

    if !digits.is_ascii() {
        bail!("input contains non-hex characters");
    }
    if digits.is_empty() {
        bail!("no hex digits in input");
    }
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits ({})", digits.len());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

/// One decoded field; `None` when the node marked it invalid.
pub struct FieldLine {
    pub label: &'static str,
    pub value: Option<String>,
}

impl FieldLine {
    fn new(label: &'static str, value: Option<String>) -> Self {
        Self { label, value }
    }
}

/// Fields of a reading in human units.
pub fn render_reading(reading: &SensorReading) -> Vec<FieldLine> {
    let env = reading.environment;
    vec![
        FieldLine::new(
            "Temperature",
            env.map(|e| format!("{:.2} °C", e.temperature_centi_c as f32 / 100.0)),
        ),
        FieldLine::new("Humidity", env.map(|e| format!("{} %", e.humidity_pct))),
        FieldLine::new(
            "Pressure",
            env.map(|e| format!("{:.2} hPa", e.pressure_pa as f32 / 100.0)),
        ),
        FieldLine::new(
            "Battery voltage",
            Some(format!("{} mV", reading.battery.voltage_mv)),
        ),
        FieldLine::new(
            "Battery level",
            Some(format!("{} %", reading.battery.level_pct)),
        ),
        FieldLine::new("Distance", reading.distance_cm.map(|cm| format!("{} cm", cm))),
        FieldLine::new(
            "External voltage",
            reading.external_mv.map(|mv| format!("{} mV", mv)),
        ),
    ]
}
