use std::sync::Arc;

use domain::DomainError;
use domain::driver::{DeviceAccess, DriverKind, SensorDriver};

use crate::camera::CameraDriver;

/// Factory for creating sensor drivers
pub struct DriverFactory;

impl DriverFactory {
    /// Create an unconfigured driver of `kind` talking through `access`
    pub fn create(
        kind: DriverKind,
        access: Arc<dyn DeviceAccess>,
    ) -> Result<Arc<dyn SensorDriver>, DomainError> {
        match kind {
            DriverKind::V4lCamera => Ok(Arc::new(CameraDriver::new(access)?) as Arc<dyn SensorDriver>),
            DriverKind::Weather | DriverKind::Gps => Err(DomainError::UnsupportedOperation(
                format!("{} driver not yet implemented", kind),
            )),
        }
    }
}
