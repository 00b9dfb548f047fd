//! Domain layer - Pure sensor model with no external dependencies
//!
//! This crate contains:
//! - Driver lifecycle state, configuration and parameter snapshots
//! - The device access port and the handle guard around it
//! - Output / input sub-interface traits and their registry
//! - Sensor events and the listener port
//! - Storage keys, time ranges and the time-indexed store port
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Invariants enforced at domain level
//! - Testable in isolation

pub mod driver;
pub mod error;
pub mod event;
pub mod interface;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use driver::{DriverConfig, DriverKind, DriverState, ParameterSet, SensorDriver};
pub use error::DomainError;
pub use event::{EventListener, SensorEvent};
pub use storage::{DataRecord, ProducerId, TimeIndexedStore, TimeRange};
