use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::DomainError;
use domain::driver::{
    DeviceAccess, DriverConfig, DriverKind, DriverState, HandleId, ParameterSet, SensorDescription,
    SensorDriver, StopReport,
};
use domain::event::EventListener;
use domain::interface::{CommandInput, OutputInterface, SubInterfaceRegistry};
use infrastructure::messaging::EventBus;
use serde_json::{Value, json};

use super::{CameraControl, CameraOutput};
use crate::driver::DriverLifecycle;

/// Name of the video output
pub const OUTPUT_NAME: &str = "camOutput";
/// Name of the parameter command input
pub const CONTROL_NAME: &str = "camParams";

/// Video camera driver: one video output and one parameter input
pub struct CameraDriver {
    lifecycle: DriverLifecycle,
    output: Arc<CameraOutput>,
}

impl CameraDriver {
    pub fn new(access: Arc<dyn DeviceAccess>) -> Result<Self, DomainError> {
        let events = Arc::new(EventBus::new());
        let output = Arc::new(CameraOutput::new(OUTPUT_NAME, events.clone()));
        let control = Arc::new(CameraControl::new(CONTROL_NAME));

        let mut registry = SubInterfaceRegistry::new();
        registry.register_output(output.clone())?;
        registry.register_input(control)?;

        Ok(Self {
            lifecycle: DriverLifecycle::new(access, registry, events),
            output,
        })
    }

    /// Typed access to the video output
    pub fn video_output(&self) -> &Arc<CameraOutput> {
        &self.output
    }

    pub fn lifecycle(&self) -> &DriverLifecycle {
        &self.lifecycle
    }
}

#[async_trait]
impl SensorDriver for CameraDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::V4lCamera
    }

    async fn init(&self, config: DriverConfig) -> Result<(), DomainError> {
        self.lifecycle.init(config).await
    }

    async fn start(&self) -> Result<(), DomainError> {
        self.lifecycle.start().await
    }

    async fn stop(&self) -> StopReport {
        self.lifecycle.stop().await
    }

    async fn update_config(&self, config: DriverConfig) -> Result<(), DomainError> {
        self.lifecycle.update_config(config).await
    }

    async fn update_params(&self, params: ParameterSet) -> Result<(), DomainError> {
        self.lifecycle.update_params(params).await
    }

    async fn execute_command(&self, input: &str, command: Value) -> Result<(), DomainError> {
        self.lifecycle.execute_command(input, command).await
    }

    async fn is_connected(&self) -> bool {
        self.lifecycle.is_connected().await
    }

    async fn cleanup(&self) {
        self.lifecycle.cleanup().await
    }

    async fn state(&self) -> DriverState {
        self.lifecycle.state().await
    }

    async fn configuration(&self) -> Option<DriverConfig> {
        self.lifecycle.configuration().await
    }

    async fn current_params(&self) -> Option<ParameterSet> {
        self.lifecycle.current_params().await
    }

    async fn handle_id(&self) -> Option<HandleId> {
        self.lifecycle.handle_id().await
    }

    fn all_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.lifecycle.registry().all_outputs()
    }

    fn observation_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.lifecycle.registry().observation_outputs()
    }

    fn status_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.lifecycle.registry().status_outputs()
    }

    fn command_inputs(&self) -> HashMap<String, Arc<dyn CommandInput>> {
        self.lifecycle.registry().all_inputs()
    }

    fn register_listener(&self, listener: &Arc<dyn EventListener>) {
        self.lifecycle.events().register(listener);
    }

    fn unregister_listener(&self, listener: &Arc<dyn EventListener>) {
        self.lifecycle.events().unregister(listener);
    }

    async fn current_description(&self) -> Result<SensorDescription, DomainError> {
        let Some(config) = self.lifecycle.configuration().await else {
            return Err(DomainError::InvalidState {
                operation: "describe",
                state: DriverState::Uninitialized.as_str(),
            });
        };
        let params = self
            .lifecycle
            .current_params()
            .await
            .unwrap_or_else(|| config.default_params.clone());

        Ok(SensorDescription::new(
            format!("local://sensors/v4l/{}", config.device_id),
            config.name.clone(),
            json!({
                "driver": self.kind().as_str(),
                "local_id": config.id,
                "device": config.device_id,
                "outputs": self.lifecycle.registry().output_names(),
                "inputs": self.lifecycle.registry().input_names(),
                "params": params,
            }),
        ))
    }
}
