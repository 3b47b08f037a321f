pub mod frame;
pub mod payload;
pub mod reading;

pub use frame::{build_frame, parse_frame, FrameError, UplinkFrame};
pub use payload::{Payload, PayloadError, PAYLOAD_LEN};
pub use reading::{BatteryStatus, EnvironmentSample, Field, SensorReading};
