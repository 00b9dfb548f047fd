use std::time::Duration;

use async_trait::async_trait;

use super::InterfaceContext;
use crate::error::DomainError;
use crate::storage::DataRecord;

/// Output sub-interface: a named producer of observation records
#[async_trait]
pub trait OutputInterface: Send + Sync {
    /// Name, unique among the driver's outputs
    fn name(&self) -> &str;

    /// Acquire resources against the live device and begin producing.
    /// Calling it on an already active output restarts it.
    async fn init(&self, ctx: &InterfaceContext) -> Result<(), DomainError>;

    /// Stop producing and drop every reference to the device.
    /// Stopping an inactive output is a no-op and returns `Ok`.
    async fn stop(&self) -> Result<(), DomainError>;

    fn is_active(&self) -> bool;

    /// Most recent record emitted since the last `init`
    fn latest_record(&self) -> Option<DataRecord>;

    /// Number of records emitted since the last `init`
    fn records_emitted(&self) -> u64;

    /// Nominal time between two records, if the output is periodic
    fn sampling_period(&self) -> Option<Duration>;
}
