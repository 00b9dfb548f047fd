pub mod archive_listener;
pub mod event_bus;

pub use archive_listener::StorageArchiver;
pub use event_bus::{DispatchReport, EventBus};
