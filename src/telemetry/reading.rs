//! Sensor readings gathered in one acquisition cycle

use heapless::Vec;

/// Values reported by the environmental sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSample {
    /// Temperature in hundredths of a degree Celsius
    pub temperature_centi_c: i16,
    /// Relative humidity in percent
    pub humidity_pct: u16,
    /// Pressure in hundredths of hPa (pascals)
    pub pressure_pa: i32,
}

/// Battery state as reported by the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatteryStatus {
    /// Battery voltage in millivolts
    pub voltage_mv: i16,
    /// Charge level in percent (0-100)
    pub level_pct: i16,
}

/// Individual measurements that can fail within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Environment,
    Distance,
    ExternalVoltage,
}

/// One complete acquisition result
///
/// A measurement that failed in this cycle is `None`. Nothing is carried over
/// from earlier cycles, so a missing value can never be replaced by a stale one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading {
    pub environment: Option<EnvironmentSample>,
    /// Distance in centimetres, `None` when no echo was received
    pub distance_cm: Option<u16>,
    /// External source voltage in millivolts
    pub external_mv: Option<u16>,
    pub battery: BatteryStatus,
}

impl SensorReading {
    /// True when every measurement succeeded
    pub fn is_complete(&self) -> bool {
        self.suspect_fields().is_empty()
    }

    /// Measurements that failed in this cycle
    pub fn suspect_fields(&self) -> Vec<Field, 3> {
        let mut fields = Vec::new();
        if self.environment.is_none() {
            let _ = fields.push(Field::Environment);
        }
        if self.distance_cm.is_none() {
            let _ = fields.push(Field::Distance);
        }
        if self.external_mv.is_none() {
            let _ = fields.push(Field::ExternalVoltage);
        }
        fields
    }

    /// Log the reading in human units
    pub fn log_summary(&self) {
        match self.environment {
            Some(env) => log::info!(
                "Temp: {}.{:02} C, Hum: {} %, Pres: {}.{:02} hPa",
                env.temperature_centi_c / 100,
                (env.temperature_centi_c % 100).unsigned_abs(),
                env.humidity_pct,
                env.pressure_pa / 100,
                (env.pressure_pa % 100).unsigned_abs()
            ),
            None => log::info!("Temp/Hum/Pres: invalid"),
        }

        log::info!(
            "Vbat: {} mV, Level: {} %",
            self.battery.voltage_mv,
            self.battery.level_pct
        );

        match self.distance_cm {
            Some(cm) => log::info!("Dist: {} cm", cm),
            None => log::info!("Dist: no echo"),
        }

        match self.external_mv {
            Some(mv) => log::info!("ExtV: {} mV", mv),
            None => log::info!("ExtV: invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_reading() {
        let reading = SensorReading {
            environment: Some(EnvironmentSample {
                temperature_centi_c: 2350,
                humidity_pct: 61,
                pressure_pa: 101_325,
            }),
            distance_cm: Some(0),
            external_mv: Some(5000),
            battery: BatteryStatus::default(),
        };

        assert!(reading.is_complete());
    }

    #[test]
    fn test_default_reading_is_all_suspect() {
        let reading = SensorReading::default();

        assert!(!reading.is_complete());
        assert_eq!(
            reading.suspect_fields().as_slice(),
            &[Field::Environment, Field::Distance, Field::ExternalVoltage]
        );
    }
}
