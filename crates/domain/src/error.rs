use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid driver configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Device {device_id} unavailable: {cause}")]
    DeviceUnavailable { device_id: String, cause: String },

    #[error("Failed to initialize sub-interface {interface}: {cause}")]
    SubInterfaceInit { interface: String, cause: String },

    #[error("Failed to apply parameters: {0}")]
    ParamApply(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Cannot {operation} while driver is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Device handle released: {0}")]
    Disconnected(String),

    #[error("Sub-interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("Sub-interface already registered: {0}")]
    DuplicateInterface(String),

    #[error("Invalid producer ID: {0}")]
    InvalidProducerId(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Capture task failed: {0}")]
    CaptureFailed(String),
}

impl DomainError {
    /// Errors that the operator can clear (plug the device back in, free it
    /// from another process) before retrying `start`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. } | Self::SubInterfaceInit { .. } | Self::Disconnected(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
