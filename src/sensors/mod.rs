pub mod acquirer;
pub mod divider;
pub mod poll;
pub mod rangefinder;
pub mod traits;

pub use acquirer::{SensorSuite, TelemetryAcquirer, TelemetrySource};
pub use divider::VoltageDivider;
pub use rangefinder::{RangeError, Rangefinder};
pub use traits::{AdcChannel, BatteryGauge, EnvironmentSensor, MicrosClock, SensorError};
