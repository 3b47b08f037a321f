//! ESP32-S3 adapters for the sensor traits
//!
//! Pins, the ADC units and the I2C bus are set up in `main`; these wrappers
//! only translate between esp-hal, the BME280 driver and the crate's traits.

use crate::config::calibration;
use crate::sensors::{AdcChannel, BatteryGauge, EnvironmentSensor, MicrosClock, SensorError, VoltageDivider};
use crate::telemetry::EnvironmentSample;
use bme280::i2c::BME280;
use embassy_time::{block_for, Delay, Duration, Instant};
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::gpio::Output;
use esp_hal::i2c::master::I2c;
use esp_hal::peripherals::{ADC1, ADC2, GPIO1, GPIO16};
use esp_hal::Blocking;

/// Settle time after enabling the battery sense divider
const BATTERY_SENSE_SETTLE: Duration = Duration::from_millis(10);

/// Embassy time driver as a microsecond clock
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl MicrosClock for EmbassyClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}

/// BME280 on the primary address (0x76)
pub struct Bme280Sensor {
    bme: BME280<I2c<'static, Blocking>>,
    delay: Delay,
}

impl Bme280Sensor {
    pub fn new(i2c: I2c<'static, Blocking>) -> Self {
        Self {
            bme: BME280::new_primary(i2c),
            delay: Delay,
        }
    }
}

impl EnvironmentSensor for Bme280Sensor {
    fn init(&mut self) -> Result<(), SensorError> {
        self.bme.init(&mut self.delay).map_err(|e| match e {
            // Nothing acknowledged the address
            bme280::Error::Bus(_) => SensorError::NotResponding,
            other => map_bme_error(other),
        })
    }

    fn measure(&mut self) -> Result<EnvironmentSample, SensorError> {
        let m = self.bme.measure(&mut self.delay).map_err(map_bme_error)?;
        Ok(EnvironmentSample {
            temperature_centi_c: (m.temperature * 100.0) as i16,
            humidity_pct: m.humidity as u16,
            pressure_pa: m.pressure as i32,
        })
    }
}

fn map_bme_error<E>(error: bme280::Error<E>) -> SensorError {
    match error {
        bme280::Error::Bus(_) => SensorError::Bus,
        bme280::Error::UnsupportedChip => SensorError::NotResponding,
        _ => SensorError::InvalidData,
    }
}

/// External voltage divider tap on GPIO16 (ADC2)
pub struct ExternalTap {
    adc: Adc<'static, ADC2<'static>, Blocking>,
    pin: AdcPin<GPIO16<'static>, ADC2<'static>>,
}

impl ExternalTap {
    pub fn new(adc: Adc<'static, ADC2<'static>, Blocking>, pin: AdcPin<GPIO16<'static>, ADC2<'static>>) -> Self {
        Self { adc, pin }
    }
}

impl AdcChannel for ExternalTap {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| SensorError::Bus)
    }
}

/// Battery sense on GPIO1 (ADC1), divider switched by GPIO37 (active low)
pub struct BatterySense {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    pin: AdcPin<GPIO1<'static>, ADC1<'static>>,
    enable: Output<'static>,
    divider: VoltageDivider,
}

impl BatterySense {
    pub fn new(
        adc: Adc<'static, ADC1<'static>, Blocking>,
        pin: AdcPin<GPIO1<'static>, ADC1<'static>>,
        enable: Output<'static>,
    ) -> Self {
        Self {
            adc,
            pin,
            enable,
            divider: VoltageDivider {
                vref_v: calibration::ADC_VREF_V,
                r1_ohms: calibration::BATTERY_R1_OHMS,
                r2_ohms: calibration::BATTERY_R2_OHMS,
            },
        }
    }
}

impl BatteryGauge for BatterySense {
    fn voltage_mv(&mut self) -> i16 {
        self.enable.set_low();
        block_for(BATTERY_SENSE_SETTLE);
        let raw = nb::block!(self.adc.read_oneshot(&mut self.pin));
        self.enable.set_high();

        match raw {
            Ok(raw) => self.divider.source_millivolts(raw).min(i16::MAX as u16) as i16,
            Err(_) => {
                log::warn!("Battery ADC read failed");
                0
            }
        }
    }

    fn level_raw(&mut self) -> u8 {
        let mv = self.voltage_mv().max(0) as u16;
        gauge_level(mv)
    }
}

/// Linear 1-254 level between the empty and full battery voltages
fn gauge_level(mv: u16) -> u8 {
    let span = (calibration::BATTERY_FULL_MV - calibration::BATTERY_EMPTY_MV) as u32;
    let above_empty = mv.clamp(calibration::BATTERY_EMPTY_MV, calibration::BATTERY_FULL_MV)
        - calibration::BATTERY_EMPTY_MV;
    (1 + above_empty as u32 * 253 / span) as u8
}
