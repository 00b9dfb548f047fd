use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod listener;
pub use listener::EventListener;

use crate::driver::{HandleId, ParameterSet};
use crate::storage::DataRecord;

/// Events emitted by a driver, both lifecycle transitions and data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorEvent {
    /// Configuration accepted
    DriverInitialized {
        driver_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Device acquired and all sub-interfaces running
    DriverStarted {
        driver_id: String,
        handle_id: HandleId,
        timestamp: DateTime<Utc>,
    },

    /// Run torn down; `diagnostics` lists failures swallowed while stopping
    DriverStopped {
        driver_id: String,
        diagnostics: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Configuration replaced through `update_config`
    ConfigChanged {
        driver_id: String,
        timestamp: DateTime<Utc>,
    },

    /// New capture parameters applied to the running device
    ParamsChanged {
        driver_id: String,
        params: ParameterSet,
        timestamp: DateTime<Utc>,
    },

    /// An output produced a record
    NewData {
        driver_id: String,
        output: String,
        record: DataRecord,
        timestamp: DateTime<Utc>,
    },

    /// A lifecycle operation failed
    DriverError {
        driver_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl SensorEvent {
    pub fn driver_initialized(driver_id: impl Into<String>) -> Self {
        Self::DriverInitialized {
            driver_id: driver_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn driver_started(driver_id: impl Into<String>, handle_id: HandleId) -> Self {
        Self::DriverStarted {
            driver_id: driver_id.into(),
            handle_id,
            timestamp: Utc::now(),
        }
    }

    pub fn driver_stopped(driver_id: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self::DriverStopped {
            driver_id: driver_id.into(),
            diagnostics,
            timestamp: Utc::now(),
        }
    }

    pub fn config_changed(driver_id: impl Into<String>) -> Self {
        Self::ConfigChanged {
            driver_id: driver_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn params_changed(driver_id: impl Into<String>, params: ParameterSet) -> Self {
        Self::ParamsChanged {
            driver_id: driver_id.into(),
            params,
            timestamp: Utc::now(),
        }
    }

    pub fn new_data(
        driver_id: impl Into<String>,
        output: impl Into<String>,
        record: DataRecord,
    ) -> Self {
        Self::NewData {
            driver_id: driver_id.into(),
            output: output.into(),
            record,
            timestamp: Utc::now(),
        }
    }

    pub fn driver_error(driver_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::DriverError {
            driver_id: driver_id.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn driver_id(&self) -> &str {
        match self {
            Self::DriverInitialized { driver_id, .. }
            | Self::DriverStarted { driver_id, .. }
            | Self::DriverStopped { driver_id, .. }
            | Self::ConfigChanged { driver_id, .. }
            | Self::ParamsChanged { driver_id, .. }
            | Self::NewData { driver_id, .. }
            | Self::DriverError { driver_id, .. } => driver_id,
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::DriverInitialized { timestamp, .. } => *timestamp,
            Self::DriverStarted { timestamp, .. } => *timestamp,
            Self::DriverStopped { timestamp, .. } => *timestamp,
            Self::ConfigChanged { timestamp, .. } => *timestamp,
            Self::ParamsChanged { timestamp, .. } => *timestamp,
            Self::NewData { timestamp, .. } => *timestamp,
            Self::DriverError { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::DriverInitialized { .. } => "DriverInitialized",
            Self::DriverStarted { .. } => "DriverStarted",
            Self::DriverStopped { .. } => "DriverStopped",
            Self::ConfigChanged { .. } => "ConfigChanged",
            Self::ParamsChanged { .. } => "ParamsChanged",
            Self::NewData { .. } => "NewData",
            Self::DriverError { .. } => "DriverError",
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::NewData { .. })
    }
}
