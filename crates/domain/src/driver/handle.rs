use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::{DeviceAccess, DeviceConnection, DeviceInfo, Frame, ParameterSet};
use crate::error::{DomainError, Result};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one device acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Exclusive ownership guard over an opened device.
///
/// `release` is idempotent and also runs on drop, so a handle can never
/// outlive its owner without closing the native connection. Sub-interfaces
/// only ever see a [`DeviceRef`], which stops working once the handle is
/// released.
pub struct DeviceHandle {
    id: HandleId,
    connection: Arc<dyn DeviceConnection>,
    released: Arc<AtomicBool>,
}

impl DeviceHandle {
    /// Open `device_id` through the access collaborator
    pub async fn acquire(access: &dyn DeviceAccess, device_id: &str) -> Result<Self> {
        let connection = access.open(device_id).await?;
        let handle = Self {
            id: HandleId::next(),
            connection,
            released: Arc::new(AtomicBool::new(false)),
        };
        tracing::debug!(device_id = %device_id, handle = %handle.id, "Device handle acquired");
        Ok(handle)
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn device_id(&self) -> &str {
        self.connection.device_id()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Borrowed view handed to sub-interfaces
    pub fn device_ref(&self) -> DeviceRef {
        DeviceRef {
            id: self.id,
            connection: self.connection.clone(),
            released: self.released.clone(),
        }
    }

    /// Close the native connection. Later calls are no-ops.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.connection.close();
        tracing::debug!(device_id = %self.connection.device_id(), handle = %self.id, "Device handle released");
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("device_id", &self.connection.device_id())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Cloneable, non-owning view of a [`DeviceHandle`].
///
/// Every operation fails with [`DomainError::Disconnected`] once the owning
/// handle has been released.
#[derive(Clone)]
pub struct DeviceRef {
    id: HandleId,
    connection: Arc<dyn DeviceConnection>,
    released: Arc<AtomicBool>,
}

impl DeviceRef {
    pub fn handle_id(&self) -> HandleId {
        self.id
    }

    pub fn device_id(&self) -> &str {
        self.connection.device_id()
    }

    pub fn is_live(&self) -> bool {
        !self.released.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(DomainError::Disconnected(format!(
                "{} for device {}",
                self.id,
                self.connection.device_id()
            )))
        }
    }

    pub fn info(&self) -> Result<DeviceInfo> {
        self.ensure_live()?;
        Ok(self.connection.info())
    }

    pub async fn configure(&self, params: &ParameterSet) -> Result<()> {
        self.ensure_live()?;
        self.connection.configure(params).await
    }

    pub async fn read_frame(&self) -> Result<Frame> {
        self.ensure_live()?;
        self.connection.read_frame().await
    }
}

impl std::fmt::Debug for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRef")
            .field("id", &self.id)
            .field("device_id", &self.connection.device_id())
            .field("live", &self.is_live())
            .finish()
    }
}
