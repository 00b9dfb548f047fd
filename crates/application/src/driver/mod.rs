//! Driver lifecycle engine and driver construction

mod factory;
mod lifecycle;
mod manager;

pub use factory::DriverFactory;
pub use lifecycle::DriverLifecycle;
pub use manager::DriverManager;
