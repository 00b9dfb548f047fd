use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ParameterSet;
use crate::error::DomainError;

/// Static information reported by an opened device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    pub driver: String,
    pub formats: Vec<String>,
}

/// One raw sample read from the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub sequence: u64,
    /// Source clock, milliseconds
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub pixel_format: String,
    pub pixels: Vec<u8>,
}

/// Native device-access collaborator.
///
/// `open` is a bounded blocking call on real hardware and is not cancellable;
/// callers that need a timeout wrap it themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceAccess: Send + Sync {
    /// Open the device, returning a live connection
    async fn open(&self, device_id: &str) -> Result<Arc<dyn DeviceConnection>, DomainError>;
}

/// Live connection to a device, as returned by [`DeviceAccess::open`].
///
/// Drivers never hold this directly; it is wrapped by a
/// [`DeviceHandle`](super::DeviceHandle) that guarantees `close` runs.
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    fn device_id(&self) -> &str;

    fn info(&self) -> DeviceInfo;

    /// Push capture parameters and control values to the device
    async fn configure(&self, params: &ParameterSet) -> Result<(), DomainError>;

    /// Wait for and return the next frame
    async fn read_frame(&self) -> Result<Frame, DomainError>;

    /// Release the native resources. Must be infallible and safe to call on
    /// a partially initialized connection or more than once.
    fn close(&self);
}
