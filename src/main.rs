#![no_std]
#![no_main]

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_time::{Delay, Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode as SpiMode;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::Async;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use static_cell::StaticCell;

use sensor_node_firmware::board::{BatterySense, Bme280Sensor, EmbassyClock, ExternalTap};
use sensor_node_firmware::config::timing;
use sensor_node_firmware::lifecycle::{LifecycleController, UplinkConfig};
use sensor_node_firmware::lora::{PhyUplink, Sx1262Driver, Sx1262Pins};
use sensor_node_firmware::power::PowerRail;
use sensor_node_firmware::scheduler::{DutyCycleConfig, DutyCycleScheduler};
use sensor_node_firmware::sensors::{Rangefinder, SensorSuite, TelemetryAcquirer};

type Uplink = PhyUplink<
    Spi<'static, Async>,
    Output<'static>,
    Input<'static>,
    Output<'static>,
    Input<'static>,
    Delay,
    EmbassyClock,
    Delay,
>;

type Telemetry = TelemetryAcquirer<
    Output<'static>,
    Delay,
    Bme280Sensor,
    Output<'static>,
    Input<'static>,
    EmbassyClock,
    ExternalTap,
    BatterySense,
>;

type Controller = LifecycleController<Uplink, Telemetry, SmallRng>;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Sensor rail (Vext, active low), held off until the first acquisition
    let vext = Output::new(peripherals.GPIO36, Level::High, OutputConfig::default());
    let rail = PowerRail::new(vext, true);

    // Ultrasonic rangefinder
    let trigger = Output::new(peripherals.GPIO47, Level::Low, OutputConfig::default());
    let echo = Input::new(peripherals.GPIO48, InputConfig::default().with_pull(Pull::Down));
    let rangefinder = Rangefinder::new(trigger, echo, EmbassyClock);

    // BME280 on I2C0
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO41)
    .with_scl(peripherals.GPIO42);
    let environment = Bme280Sensor::new(i2c);

    // External divider tap on ADC2
    let mut adc2_config = AdcConfig::new();
    let tap_pin = adc2_config.enable_pin(peripherals.GPIO16, Attenuation::_11dB);
    let divider_tap = ExternalTap::new(Adc::new(peripherals.ADC2, adc2_config), tap_pin);

    // Battery sense on ADC1, divider enabled by GPIO37 (active low)
    let mut adc1_config = AdcConfig::new();
    let battery_pin = adc1_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
    let battery_enable = Output::new(peripherals.GPIO37, Level::High, OutputConfig::default());
    let gauge = BatterySense::new(Adc::new(peripherals.ADC1, adc1_config), battery_pin, battery_enable);

    let telemetry = TelemetryAcquirer::new(
        rail,
        SensorSuite::new(environment, rangefinder, divider_tap, gauge),
        Delay,
    );

    // Configure SPI for LoRa
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(1))
            .with_mode(SpiMode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO9)
    .with_miso(peripherals.GPIO11)
    .with_mosi(peripherals.GPIO10)
    .into_async();

    // Configure LoRa control pins
    let lora_pins = Sx1262Pins {
        nss: Output::new(peripherals.GPIO8, Level::High, OutputConfig::default()),
        dio1: Input::new(peripherals.GPIO14, InputConfig::default().with_pull(Pull::Down)),
        nrst: Output::new(peripherals.GPIO12, Level::High, OutputConfig::default()),
        busy: Input::new(peripherals.GPIO13, InputConfig::default().with_pull(Pull::Down)),
    };
    let uplink = PhyUplink::new(Sx1262Driver::new(spi, lora_pins, Delay), EmbassyClock, Delay);

    // Seed the jitter from the MAC so neighbouring nodes drift apart
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let mut seed = [0u8; 8];
    seed[..6].copy_from_slice(&mac);
    let rng = SmallRng::seed_from_u64(u64::from_le_bytes(seed) ^ Instant::now().as_ticks());

    let controller = LifecycleController::new(
        uplink,
        telemetry,
        DutyCycleScheduler::new(DutyCycleConfig::default(), rng),
        UplinkConfig::default(),
    );

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(lifecycle_task(controller));
    })
}

/// Runs the device lifecycle forever
#[embassy_executor::task]
async fn lifecycle_task(mut controller: Controller) {
    // Give a serial monitor time to attach
    Timer::after(Duration::from_millis(timing::BOOT_DELAY_MS)).await;
    log::info!("Sensor node starting");

    controller.run().await
}
