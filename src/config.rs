//! Hardware and behaviour configuration for the sensor node (Heltec LoRa 32 V3 class board)

/// GPIO assignments
pub mod pins {
    /// Auxiliary sensor rail (Vext), active low
    pub const VEXT: u8 = 36;
    /// Ultrasonic trigger output
    pub const ULTRASONIC_TRIGGER: u8 = 47;
    /// Ultrasonic echo input
    pub const ULTRASONIC_ECHO: u8 = 48;
    /// External voltage divider tap (ADC2)
    pub const DIVIDER_TAP: u8 = 16;
    /// Battery sense input (ADC1)
    pub const BATTERY_SENSE: u8 = 1;
    /// Battery sense divider enable
    pub const BATTERY_SENSE_CTRL: u8 = 37;
    /// Environmental sensor I2C bus
    pub const I2C_SDA: u8 = 41;
    pub const I2C_SCL: u8 = 42;
}

/// SX1262 SPI and control pins
pub mod radio_pins {
    pub const NSS: u8 = 8;
    pub const SCLK: u8 = 9;
    pub const MOSI: u8 = 10;
    pub const MISO: u8 = 11;
    pub const NRST: u8 = 12;
    pub const BUSY: u8 = 13;
    pub const DIO1: u8 = 14;
}

/// ADC and voltage divider calibration
pub mod calibration {
    /// Measured ADC reference voltage (not the nominal 3.3V)
    pub const ADC_VREF_V: f32 = 2.38;

    /// Full-scale count of the 12-bit ADC
    pub const ADC_FULL_SCALE: f32 = 4095.0;

    /// Upper divider resistor in ohms
    pub const DIVIDER_R1_OHMS: u32 = 11_500;

    /// Lower divider resistor in ohms
    pub const DIVIDER_R2_OHMS: u32 = 4_700;

    /// Battery sense divider on the board (390k over 100k)
    pub const BATTERY_R1_OHMS: u32 = 390_000;
    pub const BATTERY_R2_OHMS: u32 = 100_000;

    /// Battery voltage mapped to the lowest and highest gauge level
    pub const BATTERY_EMPTY_MV: u16 = 3_300;
    pub const BATTERY_FULL_MV: u16 = 4_200;
}

/// Settle and measurement timing
pub mod timing {
    /// Wait after switching the sensor rail on
    pub const RAIL_SETTLE_MS: u32 = 500;

    /// Wait after the environmental sensor has been initialised
    pub const ENVIRONMENT_SETTLE_MS: u32 = 500;

    /// Wait before sampling the voltage divider
    pub const DIVIDER_SETTLE_MS: u32 = 50;

    /// Wait at boot so a serial monitor can attach
    pub const BOOT_DELAY_MS: u64 = 2_000;
}

/// Ultrasonic rangefinder (JSN-SR04T) timing
pub mod ultrasonic {
    /// Low time before the trigger pulse
    pub const TRIGGER_PRELOW_US: u32 = 2;

    /// Trigger pulse width
    pub const TRIGGER_PULSE_US: u32 = 30;

    /// Timeout for each echo edge
    pub const ECHO_TIMEOUT_US: u32 = 30_000;

    /// Echo polling granularity
    pub const ECHO_POLL_STEP_US: u32 = 1;

    /// Speed of sound in cm per 1000 us, halved for the round trip (0.034 / 2)
    pub const CM_PER_MS_ROUND_TRIP: u32 = 17;
}

/// Application uplink parameters
pub mod uplink {
    /// Application port carried with every uplink
    pub const APP_PORT: u8 = 2;

    /// Request confirmed uplinks
    pub const CONFIRMED: bool = false;
}

/// Duty cycle defaults
pub mod duty_cycle {
    /// Interval between transmissions (3 minutes)
    pub const BASE_INTERVAL_MS: u32 = 180_000;

    /// Upper bound of the random jitter added to each interval
    pub const MAX_JITTER_MS: u32 = 1_000;
}

/// Default radio configuration for the raw LoRa uplink
pub mod radio_defaults {
    /// EU868 first default channel
    pub const EU868_FREQUENCY_HZ: u32 = 868_100_000;
    /// US915 first uplink channel
    pub const US915_FREQUENCY_HZ: u32 = 902_300_000;
    /// AS923 first default channel
    pub const AS923_FREQUENCY_HZ: u32 = 923_200_000;
    pub const SPREADING_FACTOR: u8 = 9;
    pub const BANDWIDTH_KHZ: u32 = 125;
    /// Coding rate 4/5
    pub const CODING_RATE: u8 = 5;
    pub const TX_POWER_DBM: i8 = 14;
    /// Give up waiting for TX done after this long
    pub const TX_TIMEOUT_MS: u32 = 10_000;
    /// Pause after a failed join before the lifecycle retries
    pub const JOIN_RETRY_BACKOFF_MS: u32 = 5_000;
}

/// TCXO configuration
pub mod tcxo {
    /// TCXO voltage code for SX1262 register
    /// 0x02 = 1.8V
    pub const VOLTAGE_CODE: u8 = 0x02;
}

/// Raw uplink frame constants
pub mod frame {
    /// Frame format version (increment when the layout changes)
    pub const FRAME_VERSION: u8 = 1;

    /// Largest frame the radio will carry
    pub const MAX_FRAME_SIZE: usize = 64;
}
