mod config;
mod description;
mod device;
mod driver_kind;
mod driver_state;
mod handle;
mod params;
mod sensor_driver;

pub use config::DriverConfig;
pub use description::{DescriptionSupport, SensorDescription};
#[cfg(test)]
pub use device::MockDeviceAccess;
pub use device::{DeviceAccess, DeviceConnection, DeviceInfo, Frame};
pub use driver_kind::DriverKind;
pub use driver_state::DriverState;
pub use handle::{DeviceHandle, DeviceRef, HandleId};
pub use params::{MAX_DIMENSION, MAX_FRAME_RATE, ParameterSet};
pub use sensor_driver::{SensorDriver, StopReport};
