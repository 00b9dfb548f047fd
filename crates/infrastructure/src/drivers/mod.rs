mod simulated_camera;

pub use simulated_camera::{SUPPORTED_FORMATS, SimulatedCameraAccess, SimulatedCameraConfig};

use std::sync::Arc;

use domain::DomainError;
use domain::driver::DeviceAccess;
use serde::{Deserialize, Serialize};

/// Native device-access backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Simulated,
    V4l2,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "Simulated",
            Self::V4l2 => "V4l2",
        }
    }
}

/// Factory for creating device access backends
pub struct DeviceAccessFactory;

impl DeviceAccessFactory {
    /// Create a device access backend from kind and settings.
    /// `null` settings select the backend defaults.
    pub fn create(
        kind: AccessKind,
        settings: serde_json::Value,
    ) -> Result<Arc<dyn DeviceAccess>, DomainError> {
        match kind {
            AccessKind::Simulated => {
                let config = if settings.is_null() {
                    SimulatedCameraConfig::default()
                } else {
                    serde_json::from_value(settings).map_err(|e| {
                        DomainError::InvalidConfiguration(format!(
                            "Invalid simulated camera config: {}",
                            e
                        ))
                    })?
                };
                Ok(Arc::new(SimulatedCameraAccess::new(config)) as Arc<dyn DeviceAccess>)
            }
            AccessKind::V4l2 => Err(DomainError::InvalidConfiguration(
                "V4L2 access is not available in this build".to_string(),
            )),
        }
    }
}
