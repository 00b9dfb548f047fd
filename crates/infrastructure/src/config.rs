use std::collections::{HashMap, HashSet};

use config::{Config, ConfigError, Environment, File, FileFormat};
use domain::DomainError;
use domain::driver::{DriverConfig, DriverKind};
use serde::{Deserialize, Serialize};

use crate::drivers::AccessKind;
use crate::storage::StorageConfig;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccessConfig {
    pub kind: AccessKind,
    /// Backend specific settings, passed through to the access factory
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// One driver instance hosted by the node
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DriverModuleConfig {
    pub kind: DriverKind,
    pub access: AccessConfig,
    pub config: DriverConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeConfig {
    pub node_id: String,
    /// Directory holding per-module state, if any
    #[serde(default)]
    pub module_config_path: Option<String>,
    /// Free-form node properties. Keys are lowercased by the loader.
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drivers: Vec<DriverModuleConfig>,
}

impl NodeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("node_id", "sensor-node")?
            // Required so the node never starts without drivers configured by mistake
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. SENSORHUB__NODE_ID=node-02)
            .add_source(Environment::with_prefix("SENSORHUB").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a configuration held in memory
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("node_id", "sensor-node")?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Check every driver configuration and that driver ids are unique
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for module in &self.drivers {
            module.config.validate()?;
            if !seen.insert(module.config.id.as_str()) {
                return Err(DomainError::InvalidConfiguration(format!(
                    "Duplicate driver id: {}",
                    module.config.id
                )));
            }
        }
        Ok(())
    }

    pub fn driver(&self, id: &str) -> Option<&DriverModuleConfig> {
        self.drivers.iter().find(|d| d.config.id == id)
    }
}
