use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Value object identifying an independent data source in a shared store
///
/// Rules:
/// - Must be non-empty
/// - Must contain only alphanumeric, underscore, hyphen, dot, colon and slash
/// - Max length 128 characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProducerId(String);

impl ProducerId {
    /// Create a new ProducerId with validation
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(DomainError::InvalidProducerId(
                "Producer ID cannot be empty".to_string(),
            ));
        }

        if id.len() > 128 {
            return Err(DomainError::InvalidProducerId(format!(
                "Producer ID too long: {} chars (max 128)",
                id.len()
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/'))
        {
            return Err(DomainError::InvalidProducerId(format!(
                "Producer ID {id} must contain only alphanumeric, underscore, hyphen, dot, colon and forward slash"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProducerId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ProducerId> for String {
    fn from(value: ProducerId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ProducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
