//! Telemetry acquisition
//!
//! Gathers one [`SensorReading`] per cycle: environment, distance and
//! external voltage while the sensor rail is powered, then the battery once
//! the rail is off again.

use crate::config::timing;
use crate::power::{PowerRail, RailGuard};
use crate::sensors::divider::VoltageDivider;
use crate::sensors::rangefinder::Rangefinder;
use crate::sensors::traits::{AdcChannel, BatteryGauge, EnvironmentSensor, MicrosClock};
use crate::telemetry::{BatteryStatus, EnvironmentSample, SensorReading};
use core::future::Future;
use embedded_hal::delay::DelayNs as BlockingDelay;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs as AsyncDelay;

/// Source of one reading per cycle
///
/// Lets the lifecycle controller run against the real sensor stack or a
/// fixed reading in tests.
pub trait TelemetrySource {
    /// Power up, measure everything, power down
    fn collect(&mut self) -> impl Future<Output = SensorReading>;
}

/// Convert the gauge's raw level (1-254) to percent
pub fn battery_level_percent(raw: u8) -> i16 {
    ((raw as u32 * 100) / 254).min(100) as i16
}

/// Every sensor attached to the node
pub struct SensorSuite<Env, Trig, Echo, Clock, Adc, Gauge>
where
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
{
    environment: Env,
    rangefinder: Rangefinder<Trig, Echo, Clock>,
    divider_tap: Adc,
    divider: VoltageDivider,
    gauge: Gauge,
}

impl<Env, Trig, Echo, Clock, Adc, Gauge> SensorSuite<Env, Trig, Echo, Clock, Adc, Gauge>
where
    Env: EnvironmentSensor,
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
    Adc: AdcChannel,
    Gauge: BatteryGauge,
{
    pub fn new(
        environment: Env,
        rangefinder: Rangefinder<Trig, Echo, Clock>,
        divider_tap: Adc,
        gauge: Gauge,
    ) -> Self {
        Self {
            environment,
            rangefinder,
            divider_tap,
            divider: VoltageDivider::external(),
            gauge,
        }
    }

    /// Take a full reading
    ///
    /// Consumes the rail guard: the rail is switched off after the powered
    /// measurements and before the battery is read.
    pub async fn acquire<P, D>(&mut self, rail: RailGuard<'_, P>, delay: &mut D) -> SensorReading
    where
        P: OutputPin,
        D: AsyncDelay + BlockingDelay,
    {
        let environment = self.read_environment(delay).await;
        let distance_cm = self.read_distance(delay);
        let external_mv = self.read_external_voltage(delay).await;
        rail.disable();

        let reading = SensorReading {
            environment,
            distance_cm,
            external_mv,
            battery: self.read_battery(),
        };

        if !reading.is_complete() {
            log::warn!("Suspect fields this cycle: {:?}", reading.suspect_fields());
        }

        reading
    }

    async fn read_environment<D: AsyncDelay>(&mut self, delay: &mut D) -> Option<EnvironmentSample> {
        if let Err(e) = self.environment.init() {
            log::warn!("Environmental sensor not found: {}", e);
            return None;
        }
        AsyncDelay::delay_ms(delay, timing::ENVIRONMENT_SETTLE_MS).await;

        match self.environment.measure() {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::warn!("Environmental measurement failed: {}", e);
                None
            }
        }
    }

    fn read_distance<D: BlockingDelay>(&mut self, delay: &mut D) -> Option<u16> {
        match self.rangefinder.measure(delay) {
            Ok(cm) => Some(cm),
            Err(e) => {
                log::warn!("Distance: {}", e);
                None
            }
        }
    }

    async fn read_external_voltage<D: AsyncDelay>(&mut self, delay: &mut D) -> Option<u16> {
        AsyncDelay::delay_ms(delay, timing::DIVIDER_SETTLE_MS).await;

        let raw = match self.divider_tap.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("External voltage ADC read failed: {}", e);
                return None;
            }
        };

        log::debug!("Raw ADC: {}", raw);
        log::debug!("Measured on pin: {} V", self.divider.pin_volts(raw));
        log::debug!("Recovered source: {} V", self.divider.source_volts(raw));

        Some(self.divider.source_millivolts(raw))
    }

    fn read_battery(&mut self) -> BatteryStatus {
        BatteryStatus {
            voltage_mv: self.gauge.voltage_mv(),
            level_pct: battery_level_percent(self.gauge.level_raw()),
        }
    }
}

/// Sensor rail, sensors and the delay they share
pub struct TelemetryAcquirer<Rail, Delay, Env, Trig, Echo, Clock, Adc, Gauge>
where
    Rail: OutputPin,
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
{
    rail: PowerRail<Rail>,
    sensors: SensorSuite<Env, Trig, Echo, Clock, Adc, Gauge>,
    delay: Delay,
}

impl<Rail, Delay, Env, Trig, Echo, Clock, Adc, Gauge>
    TelemetryAcquirer<Rail, Delay, Env, Trig, Echo, Clock, Adc, Gauge>
where
    Rail: OutputPin,
    Delay: AsyncDelay + BlockingDelay,
    Env: EnvironmentSensor,
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
    Adc: AdcChannel,
    Gauge: BatteryGauge,
{
    pub fn new(
        rail: PowerRail<Rail>,
        sensors: SensorSuite<Env, Trig, Echo, Clock, Adc, Gauge>,
        delay: Delay,
    ) -> Self {
        Self {
            rail,
            sensors,
            delay,
        }
    }

    /// Run one powered acquisition
    pub async fn acquire(&mut self) -> SensorReading {
        let rail = self.rail.enable(&mut self.delay).await;
        self.sensors.acquire(rail, &mut self.delay).await
    }

    /// True while the sensor rail is powered
    pub fn rail_enabled(&self) -> bool {
        self.rail.is_enabled()
    }
}

impl<Rail, Delay, Env, Trig, Echo, Clock, Adc, Gauge> TelemetrySource
    for TelemetryAcquirer<Rail, Delay, Env, Trig, Echo, Clock, Adc, Gauge>
where
    Rail: OutputPin,
    Delay: AsyncDelay + BlockingDelay,
    Env: EnvironmentSensor,
    Trig: OutputPin,
    Echo: InputPin,
    Clock: MicrosClock,
    Adc: AdcChannel,
    Gauge: BatteryGauge,
{
    async fn collect(&mut self) -> SensorReading {
        self.acquire().await
    }
}
