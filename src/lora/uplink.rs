//! Raw LoRa uplink
//!
//! A [`LorawanStack`] built directly on the SX1262 for networks without a
//! LoRaWAN server: each uplink is sent as a versioned, CRC-protected frame
//! and "joining" means the radio came up. A join on a radio that failed to
//! come up retries the bring-up. Sleep puts the radio to sleep and waits out
//! the scheduled interval.

use crate::config::radio_defaults::JOIN_RETRY_BACKOFF_MS;
use crate::lora::driver::{RadioConfig, Sx1262Driver};
use crate::lora::traits::{DeviceClass, LorawanStack, RadioError, Region, Wake};
use crate::sensors::MicrosClock;
use crate::telemetry::build_frame;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiBus;

pub struct PhyUplink<Spi, Nss, Dio1, Nrst, Busy, D, Clock, W>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
    D: DelayNs,
    Clock: MicrosClock,
    W: DelayNs,
{
    radio: Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy, D>,
    clock: Clock,
    timer: W,
    /// Region from the last `initialize`, reused by join retries
    region: Option<Region>,
    /// Absolute wake time in microseconds
    wake_at_us: Option<u64>,
    sent: u32,
}

impl<Spi, Nss, Dio1, Nrst, Busy, D, Clock, W> PhyUplink<Spi, Nss, Dio1, Nrst, Busy, D, Clock, W>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
    D: DelayNs,
    Clock: MicrosClock,
    W: DelayNs,
{
    /// `timer` paces the sleep between cycles and the backoff after a failed join
    pub fn new(radio: Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy, D>, clock: Clock, timer: W) -> Self {
        Self {
            radio,
            clock,
            timer,
            region: None,
            wake_at_us: None,
            sent: 0,
        }
    }

    pub fn radio(&self) -> &Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy, D> {
        &self.radio
    }

    /// Uplinks transmitted since boot
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl<Spi, Nss, Dio1, Nrst, Busy, D, Clock, W> LorawanStack
    for PhyUplink<Spi, Nss, Dio1, Nrst, Busy, D, Clock, W>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
    D: DelayNs,
    Clock: MicrosClock,
    W: DelayNs,
{
    async fn initialize(&mut self, class: DeviceClass, region: Region) -> Result<(), RadioError> {
        if class != DeviceClass::A {
            log::warn!("Class {:?} not supported on raw uplink, transmitting only", class);
        }
        self.region = Some(region);
        self.radio.init(&RadioConfig::for_region(region)).await
    }

    async fn join(&mut self) -> Result<(), RadioError> {
        if self.radio.is_initialised() {
            return Ok(());
        }

        let Some(region) = self.region else {
            self.timer.delay_ms(JOIN_RETRY_BACKOFF_MS).await;
            return Err(RadioError::NotInitialised);
        };

        match self.radio.init(&RadioConfig::for_region(region)).await {
            Ok(()) => {
                log::info!("Radio recovered on join retry");
                Ok(())
            }
            Err(e) => {
                log::warn!("Radio bring-up failed: {}, retrying in {} ms", e, JOIN_RETRY_BACKOFF_MS);
                self.timer.delay_ms(JOIN_RETRY_BACKOFF_MS).await;
                Err(RadioError::JoinFailed)
            }
        }
    }

    async fn send(&mut self, payload: &[u8], port: u8, confirmed: bool) -> Result<(), RadioError> {
        if confirmed {
            log::warn!("Confirmed uplinks not supported on raw uplink, sending unconfirmed");
        }

        let frame = build_frame(port, payload).map_err(|_| RadioError::PayloadTooLarge)?;
        self.radio.transmit(&frame).await?;
        self.sent = self.sent.wrapping_add(1);
        log::info!("Uplink #{} sent ({} bytes, port {})", self.sent, frame.len(), port);
        Ok(())
    }

    async fn schedule_next_cycle(&mut self, interval_ms: u32) -> Result<(), RadioError> {
        self.wake_at_us = Some(self.clock.now_us() + interval_ms as u64 * 1000);
        Ok(())
    }

    async fn sleep(&mut self) -> Wake {
        if !self.radio.is_asleep() {
            if let Err(e) = self.radio.sleep().await {
                log::warn!("Radio sleep failed: {}", e);
            }
        }

        if let Some(wake_at) = self.wake_at_us.take() {
            let remaining_us = wake_at.saturating_sub(self.clock.now_us());
            let remaining_ms = (remaining_us / 1000).min(u32::MAX as u64) as u32;
            self.timer.delay_ms(remaining_ms).await;
            self.timer.delay_us((remaining_us % 1000) as u32).await;
        }
        Wake::CycleElapsed
    }
}
