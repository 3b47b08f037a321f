//! SX1262 LoRa driver
//!
//! Transmit-only: the node never listens, so the radio is configured, sends one
//! packet per cycle and is put to sleep straight afterwards.

use crate::config::{radio_defaults, tcxo};
use crate::lora::traits::{RadioError, Region};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiBus;

/// SX1262 command opcodes
mod cmd {
    pub const SET_SLEEP: u8 = 0x84;
    pub const SET_STANDBY: u8 = 0x80;
    pub const SET_TX: u8 = 0x83;
    pub const SET_RF_FREQUENCY: u8 = 0x86;
    pub const SET_PACKET_TYPE: u8 = 0x8A;
    pub const SET_MODULATION_PARAMS: u8 = 0x8B;
    pub const SET_PACKET_PARAMS: u8 = 0x8C;
    pub const SET_BUFFER_BASE_ADDRESS: u8 = 0x8F;
    pub const SET_PA_CONFIG: u8 = 0x95;
    pub const SET_DIO3_AS_TCXO_CTRL: u8 = 0x97;
    pub const SET_DIO2_AS_RF_SWITCH_CTRL: u8 = 0x9D;
    pub const SET_TX_PARAMS: u8 = 0x8E;
    pub const WRITE_BUFFER: u8 = 0x0E;
    pub const WRITE_REGISTER: u8 = 0x0D;
    pub const GET_IRQ_STATUS: u8 = 0x12;
    pub const CLEAR_IRQ_STATUS: u8 = 0x02;
    pub const SET_DIO_IRQ_PARAMS: u8 = 0x08;
}

/// SX1262 register addresses
mod reg {
    /// Over-current protection register
    pub const OCP_CONFIGURATION: u16 = 0x08E7;
}

/// Sleep configuration: warm start, register contents retained
const SLEEP_WARM_START: u8 = 0x04;

const STDBY_RC: u8 = 0x00;
const PACKET_TYPE_LORA: u8 = 0x01;

/// IRQ masks
mod irq {
    pub const TX_DONE: u16 = 0x0001;
    pub const TIMEOUT: u16 = 0x0200;
}

/// Interval between BUSY and DIO1 polls
const POLL_STEP_US: u32 = 100;

/// Modulation and power settings for the uplink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub frequency_hz: u32,
    pub spreading_factor: u8,
    pub bandwidth_khz: u32,
    /// Denominator of the 4/x coding rate
    pub coding_rate: u8,
    pub tx_power_dbm: i8,
}

impl RadioConfig {
    /// Default settings on the first channel of `region`
    pub fn for_region(region: Region) -> Self {
        let frequency_hz = match region {
            Region::Eu868 => radio_defaults::EU868_FREQUENCY_HZ,
            Region::Us915 => radio_defaults::US915_FREQUENCY_HZ,
            Region::As923 => radio_defaults::AS923_FREQUENCY_HZ,
        };
        Self {
            frequency_hz,
            ..Self::default()
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: radio_defaults::EU868_FREQUENCY_HZ,
            spreading_factor: radio_defaults::SPREADING_FACTOR,
            bandwidth_khz: radio_defaults::BANDWIDTH_KHZ,
            coding_rate: radio_defaults::CODING_RATE,
            tx_power_dbm: radio_defaults::TX_POWER_DBM,
        }
    }
}

/// RF frequency register value: `freq * 2^25 / 32 MHz`
pub fn frequency_register(freq_hz: u32) -> u32 {
    ((freq_hz as u64 * (1 << 25)) / 32_000_000) as u32
}

/// Bandwidth parameter code, 125 kHz for unsupported values
pub fn bandwidth_code(bandwidth_khz: u32) -> u8 {
    match bandwidth_khz {
        7 | 8 => 0x00,
        10 => 0x08,
        15 | 16 => 0x01,
        20 | 21 => 0x09,
        31 => 0x02,
        41 | 42 => 0x0A,
        62 | 63 => 0x03,
        125 => 0x04,
        250 => 0x05,
        500 => 0x06,
        _ => 0x04,
    }
}

/// Coding rate parameter code, 4/5 for unsupported values
pub fn coding_rate_code(coding_rate: u8) -> u8 {
    match coding_rate {
        5 => 0x01,
        6 => 0x02,
        7 => 0x03,
        8 => 0x04,
        _ => 0x01,
    }
}

/// TX power register value (two's complement for negative dBm)
pub fn tx_power_register(power_dbm: i8) -> u8 {
    power_dbm as u8
}

/// Control pins for SX1262
pub struct Sx1262Pins<Nss, Dio1, Nrst, Busy> {
    pub nss: Nss,
    pub dio1: Dio1,
    pub nrst: Nrst,
    pub busy: Busy,
}

/// SX1262 driver over an SPI bus with manual chip select
pub struct Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy, D>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
    D: DelayNs,
{
    spi: Spi,
    nss: Nss,
    dio1: Dio1,
    nrst: Nrst,
    busy: Busy,
    delay: D,
    initialised: bool,
    asleep: bool,
    config: Option<RadioConfig>,
}

impl<Spi, Nss, Dio1, Nrst, Busy, D> Sx1262Driver<Spi, Nss, Dio1, Nrst, Busy, D>
where
    Spi: SpiBus,
    Nss: OutputPin,
    Dio1: InputPin,
    Nrst: OutputPin,
    Busy: InputPin,
    D: DelayNs,
{
    pub fn new(spi: Spi, pins: Sx1262Pins<Nss, Dio1, Nrst, Busy>, delay: D) -> Self {
        Self {
            spi,
            nss: pins.nss,
            dio1: pins.dio1,
            nrst: pins.nrst,
            busy: pins.busy,
            delay,
            initialised: false,
            asleep: false,
            config: None,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn config(&self) -> Option<&RadioConfig> {
        self.config.as_ref()
    }

    /// Reset and configure the radio, leaving it in standby
    pub async fn init(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        self.initialised = false;
        self.reset().await;
        self.wait_not_busy().await?;

        self.set_standby().await?;

        // DIO3 powers the 1.8V TCXO
        self.configure_tcxo().await?;
        self.delay.delay_ms(10).await;

        self.write_command(cmd::SET_DIO2_AS_RF_SWITCH_CTRL, &[0x01])
            .await?;
        self.set_current_limit(140).await?;
        self.write_command(cmd::SET_PACKET_TYPE, &[PACKET_TYPE_LORA])
            .await?;
        self.write_command(cmd::SET_BUFFER_BASE_ADDRESS, &[0x00, 0x80])
            .await?;

        self.configure(config).await?;

        self.initialised = true;
        self.asleep = false;
        log::info!(
            "SX1262 ready: {} Hz, SF{}, {} kHz, {} dBm",
            config.frequency_hz,
            config.spreading_factor,
            config.bandwidth_khz,
            config.tx_power_dbm
        );
        Ok(())
    }

    /// Apply frequency, modulation and power settings
    pub async fn configure(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        self.set_standby().await?;

        let freq = frequency_register(config.frequency_hz).to_be_bytes();
        self.write_command(cmd::SET_RF_FREQUENCY, &freq).await?;

        // Low data rate optimisation: required for SF11/SF12 at 125kHz
        let ldro = u8::from(config.spreading_factor >= 11 && config.bandwidth_khz <= 125);
        let modulation = [
            config.spreading_factor,
            bandwidth_code(config.bandwidth_khz),
            coding_rate_code(config.coding_rate),
            ldro,
        ];
        self.write_command(cmd::SET_MODULATION_PARAMS, &modulation)
            .await?;

        // paDutyCycle=0x04, hpMax=0x07, deviceSel=0x00 (SX1262), paLut=0x01
        self.write_command(cmd::SET_PA_CONFIG, &[0x04, 0x07, 0x00, 0x01])
            .await?;
        // Ramp time 200us
        self.write_command(
            cmd::SET_TX_PARAMS,
            &[tx_power_register(config.tx_power_dbm), 0x04],
        )
        .await?;

        self.config = Some(*config);
        Ok(())
    }

    /// Send one packet and wait for TX done
    pub async fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError> {
        if !self.initialised {
            return Err(RadioError::NotInitialised);
        }
        if data.is_empty() || data.len() > u8::MAX as usize {
            return Err(RadioError::PayloadTooLarge);
        }

        self.set_standby().await?;
        self.asleep = false;
        self.set_packet_params(data.len() as u8).await?;
        self.write_buffer(0x00, data).await?;

        self.configure_irq(irq::TX_DONE | irq::TIMEOUT).await?;
        self.clear_irq(0xFFFF).await?;

        // Timeout 0: the driver enforces its own deadline
        self.write_command(cmd::SET_TX, &[0x00, 0x00, 0x00]).await?;

        let irq_status = self.wait_for_irq(radio_defaults::TX_TIMEOUT_MS).await?;
        self.clear_irq(0xFFFF).await?;

        if irq_status & irq::TX_DONE != 0 {
            Ok(())
        } else {
            Err(RadioError::TransmitFailed)
        }
    }

    /// Put the radio into warm-start sleep
    ///
    /// The next command wakes it through the NSS falling edge.
    pub async fn sleep(&mut self) -> Result<(), RadioError> {
        self.write_command(cmd::SET_SLEEP, &[SLEEP_WARM_START]).await?;
        self.asleep = true;
        Ok(())
    }

    async fn reset(&mut self) {
        let _ = self.nrst.set_low();
        self.delay.delay_ms(10).await;
        let _ = self.nrst.set_high();
        self.delay.delay_ms(20).await;
    }

    /// Wait for the BUSY pin to go low
    async fn wait_not_busy(&mut self) -> Result<(), RadioError> {
        for _ in 0..1000 {
            if self.busy.is_low().unwrap_or(false) {
                return Ok(());
            }
            self.delay.delay_us(POLL_STEP_US).await;
        }
        Err(RadioError::BusyTimeout)
    }

    async fn write_command(&mut self, cmd: u8, data: &[u8]) -> Result<(), RadioError> {
        self.wait_not_busy().await?;

        let mut buf = [0u8; 16];
        buf[0] = cmd;
        let len = 1 + data.len().min(15);
        buf[1..len].copy_from_slice(&data[..len - 1]);

        let _ = self.nss.set_low();
        let result = self.spi.write(&buf[..len]).await;
        let _ = self.nss.set_high();
        result.map_err(|_| RadioError::SpiError)
    }

    async fn read_command(&mut self, cmd: u8, len: usize) -> Result<[u8; 16], RadioError> {
        self.wait_not_busy().await?;

        // Command byte + status byte, then the response
        let mut tx_buf = [0u8; 18];
        let mut rx_buf = [0u8; 18];
        tx_buf[0] = cmd;
        let total_len = 2 + len.min(16);

        let _ = self.nss.set_low();
        let result = self
            .spi
            .transfer(&mut rx_buf[..total_len], &tx_buf[..total_len])
            .await;
        let _ = self.nss.set_high();
        result.map_err(|_| RadioError::SpiError)?;

        let mut response = [0u8; 16];
        response[..total_len - 2].copy_from_slice(&rx_buf[2..total_len]);
        Ok(response)
    }

    async fn write_buffer(&mut self, offset: u8, data: &[u8]) -> Result<(), RadioError> {
        self.wait_not_busy().await?;

        let mut buf = [0u8; 257];
        buf[0] = cmd::WRITE_BUFFER;
        buf[1] = offset;
        let len = data.len().min(255);
        buf[2..2 + len].copy_from_slice(&data[..len]);

        let _ = self.nss.set_low();
        let result = self.spi.write(&buf[..2 + len]).await;
        let _ = self.nss.set_high();
        result.map_err(|_| RadioError::SpiError)
    }

    async fn configure_tcxo(&mut self) -> Result<(), RadioError> {
        // Voltage code + 24-bit startup timeout (~5ms)
        let timeout: u32 = 0x000140;
        let data = [
            tcxo::VOLTAGE_CODE,
            (timeout >> 16) as u8,
            (timeout >> 8) as u8,
            timeout as u8,
        ];
        self.write_command(cmd::SET_DIO3_AS_TCXO_CTRL, &data).await
    }

    /// Over-current protection limit in 2.5 mA steps
    async fn set_current_limit(&mut self, current_ma: u16) -> Result<(), RadioError> {
        let ocp_value = ((current_ma as u32 * 10) / 25).min(63) as u8;
        let [hi, lo] = reg::OCP_CONFIGURATION.to_be_bytes();
        self.write_command(cmd::WRITE_REGISTER, &[hi, lo, ocp_value])
            .await
    }

    async fn set_standby(&mut self) -> Result<(), RadioError> {
        self.write_command(cmd::SET_STANDBY, &[STDBY_RC]).await
    }

    async fn set_packet_params(&mut self, payload_len: u8) -> Result<(), RadioError> {
        let data = [
            0x00, 0x08, // Preamble length: 8 symbols
            0x00, // Explicit header
            payload_len,
            0x01, // CRC on
            0x00, // Standard IQ
        ];
        self.write_command(cmd::SET_PACKET_PARAMS, &data).await
    }

    /// Route `irq_mask` to DIO1
    async fn configure_irq(&mut self, irq_mask: u16) -> Result<(), RadioError> {
        let [hi, lo] = irq_mask.to_be_bytes();
        let data = [hi, lo, hi, lo, 0x00, 0x00, 0x00, 0x00];
        self.write_command(cmd::SET_DIO_IRQ_PARAMS, &data).await
    }

    async fn clear_irq(&mut self, irq_mask: u16) -> Result<(), RadioError> {
        self.write_command(cmd::CLEAR_IRQ_STATUS, &irq_mask.to_be_bytes())
            .await
    }

    async fn get_irq_status(&mut self) -> Result<u16, RadioError> {
        let result = self.read_command(cmd::GET_IRQ_STATUS, 2).await?;
        Ok(u16::from_be_bytes([result[0], result[1]]))
    }

    /// Wait for DIO1 with timeout
    async fn wait_for_irq(&mut self, timeout_ms: u32) -> Result<u16, RadioError> {
        let polls = timeout_ms.saturating_mul(1000 / POLL_STEP_US);
        for _ in 0..polls {
            if self.dio1.is_high().unwrap_or(false) {
                return self.get_irq_status().await;
            }
            self.delay.delay_us(POLL_STEP_US).await;
        }
        Err(RadioError::Timeout)
    }
}
