//! Application layer - Driver lifecycle and driver variants

pub mod camera;
pub mod driver;

pub use camera::CameraDriver;
pub use driver::{DriverFactory, DriverLifecycle, DriverManager};
