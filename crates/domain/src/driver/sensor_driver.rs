use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{
    DescriptionSupport, DriverConfig, DriverKind, DriverState, HandleId, ParameterSet,
    SensorDescription,
};
use crate::error::DomainError;
use crate::event::EventListener;
use crate::interface::{CommandInput, OutputInterface};

/// Failures swallowed by a `stop`. Stopping never fails as a whole; this
/// only tells the caller what could not be cleaned up gracefully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopReport {
    pub failures: Vec<DomainError>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.failures.iter().map(|e| e.to_string()).collect()
    }
}

/// Lifecycle contract shared by every sensor driver variant.
///
/// Lifecycle operations are serialized by the implementation; callers may
/// invoke them from any task.
#[async_trait]
pub trait SensorDriver: Send + Sync {
    fn kind(&self) -> DriverKind;

    /// Store a configuration. Never touches the device.
    async fn init(&self, config: DriverConfig) -> Result<(), DomainError>;

    /// Acquire the device and start every sub-interface
    async fn start(&self) -> Result<(), DomainError>;

    /// Best-effort teardown; idempotent
    async fn stop(&self) -> StopReport;

    /// `stop`, `init`, `start` as one operation
    async fn update_config(&self, config: DriverConfig) -> Result<(), DomainError>;

    /// Apply new capture parameters without releasing the device
    async fn update_params(&self, params: ParameterSet) -> Result<(), DomainError>;

    /// Route a command value to the named input
    async fn execute_command(&self, input: &str, command: Value) -> Result<(), DomainError>;

    /// Probe the configured device with a throwaway acquisition
    async fn is_connected(&self) -> bool;

    /// Stop and forget the configuration
    async fn cleanup(&self);

    async fn state(&self) -> DriverState;

    async fn configuration(&self) -> Option<DriverConfig>;

    async fn current_params(&self) -> Option<ParameterSet>;

    async fn handle_id(&self) -> Option<HandleId>;

    fn all_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>>;

    fn observation_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>>;

    fn status_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>>;

    fn command_inputs(&self) -> HashMap<String, Arc<dyn CommandInput>>;

    fn register_listener(&self, listener: &Arc<dyn EventListener>);

    fn unregister_listener(&self, listener: &Arc<dyn EventListener>);

    fn description_support(&self) -> DescriptionSupport {
        DescriptionSupport::default()
    }

    async fn current_description(&self) -> Result<SensorDescription, DomainError>;

    /// Description valid at `time`; requires history support. Drivers that
    /// keep no older versions only answer from the current description.
    async fn description_at(&self, time: DateTime<Utc>) -> Result<SensorDescription, DomainError> {
        if !self.description_support().history {
            return Err(DomainError::UnsupportedOperation(format!(
                "History of sensor description is not supported by the {} driver",
                self.kind()
            )));
        }
        let current = self.current_description().await?;
        if current.valid_from <= time {
            Ok(current)
        } else {
            Err(DomainError::UnsupportedOperation(format!(
                "No description of the {} driver recorded before {}",
                self.kind(),
                current.valid_from
            )))
        }
    }

    /// Replace the description; requires update support and an override
    async fn update_description(
        &self,
        _description: SensorDescription,
        _record_history: bool,
    ) -> Result<(), DomainError> {
        let reason = if self.description_support().update {
            "is declared but not implemented"
        } else {
            "is not supported"
        };
        Err(DomainError::UnsupportedOperation(format!(
            "Update of sensor description {} by the {} driver",
            reason,
            self.kind()
        )))
    }

    async fn is_enabled(&self) -> bool {
        self.configuration().await.is_some_and(|c| c.enabled)
    }

    async fn name(&self) -> Option<String> {
        self.configuration().await.map(|c| c.name)
    }

    async fn local_id(&self) -> Option<String> {
        self.configuration().await.map(|c| c.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_report_diagnostics() {
        let report = StopReport {
            failures: vec![DomainError::Disconnected("cam0".to_string())],
        };
        assert!(!report.is_clean());
        assert_eq!(report.diagnostics(), vec!["Device handle released: cam0"]);
        assert!(StopReport::default().is_clean());
    }
}
