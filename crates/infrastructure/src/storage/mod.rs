mod memory_store;
mod sqlite_store;

pub use memory_store::InMemoryTimeStore;
pub use sqlite_store::SqliteTimeStore;

use std::sync::Arc;

use domain::DomainError;
use domain::storage::TimeIndexedStore;
use serde::{Deserialize, Serialize};

/// Archive backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sqlite {
        url: String,
    },
}

/// Factory for creating time stores
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn TimeIndexedStore>, DomainError> {
        match config {
            StorageConfig::Memory => {
                tracing::info!("Using in-memory time store");
                Ok(Arc::new(InMemoryTimeStore::new()))
            }
            StorageConfig::Sqlite { url } => {
                Ok(Arc::new(SqliteTimeStore::connect(url).await?))
            }
        }
    }
}
