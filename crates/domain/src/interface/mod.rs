//! Named sub-interfaces a driver is decomposed into.
//!
//! Outputs produce observation records, inputs accept control commands.
//! Both are created once with their driver and re-initialized against the
//! live device on every start.

mod input;
mod output;
mod registry;

pub use input::CommandInput;
pub use output::OutputInterface;
pub use registry::SubInterfaceRegistry;

use crate::driver::{DeviceRef, ParameterSet};
use crate::storage::ProducerId;

/// Everything a sub-interface may use between its `init` and `stop`.
///
/// The device view must not be retained past `stop`.
#[derive(Debug, Clone)]
pub struct InterfaceContext {
    pub driver_id: String,
    pub producer_id: ProducerId,
    pub device: DeviceRef,
    pub params: ParameterSet,
}
