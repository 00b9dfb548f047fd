use serde::{Deserialize, Serialize};

use super::ParameterSet;
use crate::error::{DomainError, Result};
use crate::storage::ProducerId;

/// Activation settings of one driver instance.
///
/// Supplied by the configuration collaborator and never mutated by the
/// driver. `id` is the local identifier and doubles as the producer ID of
/// the records the driver emits, so it follows the producer ID rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub id: String,
    pub name: String,
    pub device_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub default_params: ParameterSet,
}

fn default_enabled() -> bool {
    true
}

impl DriverConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_id: device_id.into(),
            enabled: true,
            default_params: ParameterSet::default(),
        }
    }

    pub fn with_params(mut self, params: ParameterSet) -> Self {
        self.default_params = params;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "Device identifier is required".to_string(),
            ));
        }

        ProducerId::new(self.id.as_str()).map_err(|e| {
            DomainError::InvalidConfiguration(format!("Invalid local ID '{}': {}", self.id, e))
        })?;

        self.default_params.validate()
    }

    /// Producer ID under which this driver's records are archived
    pub fn producer_id(&self) -> Result<ProducerId> {
        ProducerId::new(self.id.as_str())
    }
}
