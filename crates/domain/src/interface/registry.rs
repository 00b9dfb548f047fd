use std::collections::HashMap;
use std::sync::Arc;

use super::{CommandInput, InterfaceContext, OutputInterface};
use crate::error::{DomainError, Result};

/// Named outputs and inputs owned by one driver.
///
/// Entries are registered once, when the driver is built, and are kept in
/// registration order: `init_all` initializes every output before any input
/// and walks each list in that order.
#[derive(Default)]
pub struct SubInterfaceRegistry {
    outputs: Vec<Arc<dyn OutputInterface>>,
    status_outputs: Vec<Arc<dyn OutputInterface>>,
    inputs: Vec<Arc<dyn CommandInput>>,
}

impl SubInterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observation output
    pub fn register_output(&mut self, output: Arc<dyn OutputInterface>) -> Result<()> {
        self.ensure_output_name_free(output.name())?;
        self.outputs.push(output);
        Ok(())
    }

    /// Register a device health/status output, distinct from observations
    pub fn register_status_output(&mut self, output: Arc<dyn OutputInterface>) -> Result<()> {
        self.ensure_output_name_free(output.name())?;
        self.status_outputs.push(output);
        Ok(())
    }

    pub fn register_input(&mut self, input: Arc<dyn CommandInput>) -> Result<()> {
        if self.inputs.iter().any(|i| i.name() == input.name()) {
            return Err(DomainError::DuplicateInterface(input.name().to_string()));
        }
        self.inputs.push(input);
        Ok(())
    }

    fn ensure_output_name_free(&self, name: &str) -> Result<()> {
        if self.ordered_outputs().any(|o| o.name() == name) {
            return Err(DomainError::DuplicateInterface(name.to_string()));
        }
        Ok(())
    }

    /// Observation outputs followed by status outputs, in registration order
    fn ordered_outputs(&self) -> impl Iterator<Item = &Arc<dyn OutputInterface>> {
        self.outputs.iter().chain(self.status_outputs.iter())
    }

    pub fn output(&self, name: &str) -> Option<Arc<dyn OutputInterface>> {
        self.ordered_outputs().find(|o| o.name() == name).cloned()
    }

    pub fn input(&self, name: &str) -> Option<Arc<dyn CommandInput>> {
        self.inputs.iter().find(|i| i.name() == name).cloned()
    }

    pub fn all_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.ordered_outputs()
            .map(|o| (o.name().to_string(), o.clone()))
            .collect()
    }

    pub fn observation_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.outputs
            .iter()
            .map(|o| (o.name().to_string(), o.clone()))
            .collect()
    }

    /// Empty unless the driver registered status outputs
    pub fn status_outputs(&self) -> HashMap<String, Arc<dyn OutputInterface>> {
        self.status_outputs
            .iter()
            .map(|o| (o.name().to_string(), o.clone()))
            .collect()
    }

    pub fn all_inputs(&self) -> HashMap<String, Arc<dyn CommandInput>> {
        self.inputs
            .iter()
            .map(|i| (i.name().to_string(), i.clone()))
            .collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.ordered_outputs().map(|o| o.name().to_string()).collect()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|i| i.name().to_string()).collect()
    }

    /// Initialize all outputs, then all inputs.
    ///
    /// On the first failure every entry touched so far (the failing one
    /// included) is stopped again before the error is returned, so nothing
    /// keeps using the device.
    pub async fn init_all(&self, ctx: &InterfaceContext) -> Result<()> {
        let mut initialized_outputs: Vec<&Arc<dyn OutputInterface>> = Vec::new();
        for output in self.ordered_outputs() {
            initialized_outputs.push(output);
            if let Err(e) = output.init(ctx).await {
                self.rollback(&initialized_outputs, &[]).await;
                return Err(DomainError::SubInterfaceInit {
                    interface: output.name().to_string(),
                    cause: e.to_string(),
                });
            }
        }

        let mut initialized_inputs: Vec<&Arc<dyn CommandInput>> = Vec::new();
        for input in &self.inputs {
            initialized_inputs.push(input);
            if let Err(e) = input.init(ctx).await {
                self.rollback(&initialized_outputs, &initialized_inputs).await;
                return Err(DomainError::SubInterfaceInit {
                    interface: input.name().to_string(),
                    cause: e.to_string(),
                });
            }
        }

        Ok(())
    }

    async fn rollback(
        &self,
        outputs: &[&Arc<dyn OutputInterface>],
        inputs: &[&Arc<dyn CommandInput>],
    ) {
        for output in outputs {
            if let Err(e) = output.stop().await {
                tracing::warn!(interface = %output.name(), error = %e, "Rollback stop failed");
            }
        }
        for input in inputs {
            if let Err(e) = input.stop().await {
                tracing::warn!(interface = %input.name(), error = %e, "Rollback stop failed");
            }
        }
    }

    /// Stop every output, collecting failures instead of stopping early
    pub async fn stop_outputs(&self) -> Vec<DomainError> {
        let mut failures = Vec::new();
        for output in self.ordered_outputs() {
            if let Err(e) = output.stop().await {
                tracing::warn!(interface = %output.name(), error = %e, "Failed to stop output");
                failures.push(e);
            }
        }
        failures
    }

    /// Stop every input, collecting failures instead of stopping early
    pub async fn stop_inputs(&self) -> Vec<DomainError> {
        let mut failures = Vec::new();
        for input in &self.inputs {
            if let Err(e) = input.stop().await {
                tracing::warn!(interface = %input.name(), error = %e, "Failed to stop input");
                failures.push(e);
            }
        }
        failures
    }
}
