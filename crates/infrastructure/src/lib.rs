//! Infrastructure layer - Adapters for the domain ports

pub mod config;
pub mod drivers;
pub mod messaging;
pub mod storage;

pub use config::NodeConfig;
pub use drivers::{AccessKind, DeviceAccessFactory, SimulatedCameraAccess};
pub use messaging::{DispatchReport, EventBus, StorageArchiver};
pub use storage::{InMemoryTimeStore, SqliteTimeStore, StorageConfig, StorageFactory};
