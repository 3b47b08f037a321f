//! Fixed 16-byte uplink payload
//!
//! # Layout
//!
//! All multi-byte fields are big-endian:
//!
//! | Offset | Field            | Type | Unit                  | Invalid     |
//! |--------|------------------|------|-----------------------|-------------|
//! | 0-1    | temperature      | i16  | hundredths of °C      | 0x8000      |
//! | 2-3    | humidity         | u16  | percent               | 0xFFFF      |
//! | 4-7    | pressure         | i32  | hundredths of hPa     | 0x80000000  |
//! | 8-9    | battery voltage  | i16  | mV                    |             |
//! | 10-11  | battery level    | i16  | percent               |             |
//! | 12-13  | distance         | u16  | cm                    | 0xFFFF      |
//! | 14-15  | external voltage | u16  | mV                    | 0xFFFF      |
//!
//! Failed measurements are sent as the sentinel in the last column, so a
//! distance of 0 is always a real reading.

use crate::telemetry::reading::{BatteryStatus, EnvironmentSample, SensorReading};

/// Payload length in bytes
pub const PAYLOAD_LEN: usize = 16;

/// Temperature sent when the environmental sensor failed
pub const TEMPERATURE_INVALID: i16 = i16::MIN;
/// Humidity sent when the environmental sensor failed
pub const HUMIDITY_INVALID: u16 = u16::MAX;
/// Pressure sent when the environmental sensor failed
pub const PRESSURE_INVALID: i32 = i32::MIN;
/// Distance sent when no echo was received
pub const DISTANCE_NO_ECHO: u16 = u16::MAX;
/// External voltage sent when the ADC read failed
pub const EXTERNAL_VOLTAGE_INVALID: u16 = u16::MAX;

/// Errors from decoding a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Buffer is not exactly [`PAYLOAD_LEN`] bytes
    InvalidLength(usize),
}

impl core::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PayloadError::InvalidLength(len) => {
                write!(f, "payload must be {} bytes, got {}", PAYLOAD_LEN, len)
            }
        }
    }
}

impl core::error::Error for PayloadError {}

/// Encoded uplink payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    /// Encode a reading
    pub fn encode(reading: &SensorReading) -> Self {
        let (temperature, humidity, pressure) = match reading.environment {
            Some(env) => (env.temperature_centi_c, env.humidity_pct, env.pressure_pa),
            None => (TEMPERATURE_INVALID, HUMIDITY_INVALID, PRESSURE_INVALID),
        };
        let distance = reading
            .distance_cm
            .map_or(DISTANCE_NO_ECHO, |cm| cm.min(DISTANCE_NO_ECHO - 1));
        let external = reading
            .external_mv
            .map_or(EXTERNAL_VOLTAGE_INVALID, |mv| mv.min(EXTERNAL_VOLTAGE_INVALID - 1));

        let mut buf = [0u8; PAYLOAD_LEN];
        buf[0..2].copy_from_slice(&temperature.to_be_bytes());
        buf[2..4].copy_from_slice(&humidity.to_be_bytes());
        buf[4..8].copy_from_slice(&pressure.to_be_bytes());
        buf[8..10].copy_from_slice(&reading.battery.voltage_mv.to_be_bytes());
        buf[10..12].copy_from_slice(&reading.battery.level_pct.to_be_bytes());
        buf[12..14].copy_from_slice(&distance.to_be_bytes());
        buf[14..16].copy_from_slice(&external.to_be_bytes());

        Self(buf)
    }

    /// Decode a received payload back into a reading
    ///
    /// The environmental block is treated as invalid if any of its three
    /// fields carries its sentinel.
    pub fn decode(bytes: &[u8]) -> Result<SensorReading, PayloadError> {
        let buf: &[u8; PAYLOAD_LEN] = bytes
            .try_into()
            .map_err(|_| PayloadError::InvalidLength(bytes.len()))?;

        let be16 = |at: usize| [buf[at], buf[at + 1]];

        let temperature = i16::from_be_bytes(be16(0));
        let humidity = u16::from_be_bytes(be16(2));
        let pressure = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let distance = u16::from_be_bytes(be16(12));
        let external = u16::from_be_bytes(be16(14));

        let environment = if temperature == TEMPERATURE_INVALID
            || humidity == HUMIDITY_INVALID
            || pressure == PRESSURE_INVALID
        {
            None
        } else {
            Some(EnvironmentSample {
                temperature_centi_c: temperature,
                humidity_pct: humidity,
                pressure_pa: pressure,
            })
        };

        Ok(SensorReading {
            environment,
            distance_cm: (distance != DISTANCE_NO_ECHO).then_some(distance),
            external_mv: (external != EXTERNAL_VOLTAGE_INVALID).then_some(external),
            battery: BatteryStatus {
                voltage_mv: i16::from_be_bytes(be16(8)),
                level_pct: i16::from_be_bytes(be16(10)),
            },
        })
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    pub fn len(&self) -> usize {
        PAYLOAD_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_reading() -> SensorReading {
        SensorReading {
            environment: Some(EnvironmentSample {
                temperature_centi_c: 2350,
                humidity_pct: 61,
                pressure_pa: 101_325,
            }),
            distance_cm: Some(120),
            external_mv: Some(5000),
            battery: BatteryStatus {
                voltage_mv: 4100,
                level_pct: 87,
            },
        }
    }

    #[test]
    fn test_encode_reference_reading() {
        let payload = Payload::encode(&reference_reading());

        assert_eq!(
            payload.as_bytes(),
            &[
                0x09, 0x2E, // 2350
                0x00, 0x3D, // 61
                0x00, 0x01, 0x8B, 0xCD, // 101325
                0x10, 0x04, // 4100
                0x00, 0x57, // 87
                0x00, 0x78, // 120
                0x13, 0x88, // 5000
            ]
        );
    }

    #[test]
    fn test_decode_reference_reading() {
        let reading = reference_reading();
        let payload = Payload::encode(&reading);

        assert_eq!(Payload::decode(payload.as_bytes()), Ok(reading));
    }

    #[test]
    fn test_negative_values_keep_sign() {
        let reading = SensorReading {
            environment: Some(EnvironmentSample {
                temperature_centi_c: -1575,
                humidity_pct: 100,
                pressure_pa: 87_000,
            }),
            distance_cm: Some(0),
            external_mv: Some(0),
            battery: BatteryStatus {
                voltage_mv: -1,
                level_pct: 0,
            },
        };
        let payload = Payload::encode(&reading);

        // -1575 = 0xF9D9
        assert_eq!(&payload.as_bytes()[0..2], &[0xF9, 0xD9]);
        assert_eq!(&payload.as_bytes()[8..10], &[0xFF, 0xFF]);
        assert_eq!(Payload::decode(payload.as_bytes()), Ok(reading));
    }

    #[test]
    fn test_failed_measurements_use_sentinels() {
        let reading = SensorReading {
            battery: BatteryStatus {
                voltage_mv: 3700,
                level_pct: 50,
            },
            ..SensorReading::default()
        };
        let payload = Payload::encode(&reading);
        let bytes = payload.as_bytes();

        assert_eq!(payload.len(), PAYLOAD_LEN);
        assert_eq!(&bytes[0..2], &[0x80, 0x00]);
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
        assert_eq!(&bytes[4..8], &[0x80, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[12..14], &[0xFF, 0xFF]);
        assert_eq!(&bytes[14..16], &[0xFF, 0xFF]);

        let decoded = Payload::decode(bytes).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_zero_distance_is_not_no_echo() {
        let mut reading = reference_reading();
        reading.distance_cm = Some(0);
        let payload = Payload::encode(&reading);

        assert_eq!(&payload.as_bytes()[12..14], &[0x00, 0x00]);
        assert_eq!(Payload::decode(payload.as_bytes()).unwrap().distance_cm, Some(0));
    }

    #[test]
    fn test_distance_clamped_below_sentinel() {
        let mut reading = reference_reading();
        reading.distance_cm = Some(u16::MAX);
        let payload = Payload::encode(&reading);

        assert_eq!(&payload.as_bytes()[12..14], &[0xFF, 0xFE]);
    }

    #[test]
    fn test_external_voltage_clamped_below_sentinel() {
        let mut reading = reference_reading();
        reading.external_mv = Some(u16::MAX);
        let payload = Payload::encode(&reading);

        assert_eq!(&payload.as_bytes()[14..16], &[0xFF, 0xFE]);
        let decoded = Payload::decode(payload.as_bytes()).unwrap();
        assert_eq!(decoded.external_mv, Some(0xFFFE));
    }

    #[test]
    fn test_length_is_fixed() {
        let extremes = [
            SensorReading::default(),
            reference_reading(),
            SensorReading {
                environment: Some(EnvironmentSample {
                    temperature_centi_c: i16::MAX,
                    humidity_pct: 0,
                    pressure_pa: i32::MAX,
                }),
                distance_cm: Some(u16::MAX - 1),
                external_mv: Some(u16::MAX - 1),
                battery: BatteryStatus {
                    voltage_mv: i16::MIN,
                    level_pct: i16::MAX,
                },
            },
        ];

        for reading in &extremes {
            assert_eq!(Payload::encode(reading).as_ref().len(), 16);
        }
    }

    #[test]
    fn test_decode_wrong_length() {
        assert_eq!(
            Payload::decode(&[0u8; 15]),
            Err(PayloadError::InvalidLength(15))
        );
        assert_eq!(
            Payload::decode(&[0u8; 17]),
            Err(PayloadError::InvalidLength(17))
        );
    }
}
