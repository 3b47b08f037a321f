#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod lifecycle;
pub mod lora;
pub mod power;
pub mod scheduler;
pub mod sensors;
pub mod telemetry;

// ESP32-S3 peripherals, only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod board;
