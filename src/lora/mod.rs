pub mod driver;
pub mod traits;
pub mod uplink;

pub use driver::{RadioConfig, Sx1262Driver, Sx1262Pins};
pub use traits::{DeviceClass, LorawanStack, RadioError, Region, Wake};
pub use uplink::PhyUplink;
