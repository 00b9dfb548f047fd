use async_trait::async_trait;
use serde_json::Value;

use super::InterfaceContext;
use crate::driver::ParameterSet;
use crate::error::DomainError;

/// Input sub-interface: accepts control commands for the device
#[async_trait]
pub trait CommandInput: Send + Sync {
    /// Name, unique among the driver's inputs
    fn name(&self) -> &str;

    async fn init(&self, ctx: &InterfaceContext) -> Result<(), DomainError>;

    /// Stopping an inactive input is a no-op and returns `Ok`
    async fn stop(&self) -> Result<(), DomainError>;

    fn is_active(&self) -> bool;

    /// Validate `command`, forward it to the device and return the parameter
    /// set the device now runs with.
    async fn execute(&self, command: Value) -> Result<ParameterSet, DomainError>;
}
