use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProducerId;

/// Composite storage key. Unique per producer in practice; stores apply
/// last-write-wins when a key repeats.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    pub producer_id: ProducerId,
    pub timestamp: i64,
}

impl StorageKey {
    pub fn new(producer_id: ProducerId, timestamp: i64) -> Self {
        Self {
            producer_id,
            timestamp,
        }
    }
}

/// One observation as emitted by an output and archived by a store.
/// The payload is an opaque JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub producer_id: ProducerId,
    pub timestamp: i64,
    pub data: Value,
}

impl DataRecord {
    pub fn new(producer_id: ProducerId, timestamp: i64, data: Value) -> Self {
        Self {
            producer_id,
            timestamp,
            data,
        }
    }

    pub fn key(&self) -> StorageKey {
        StorageKey::new(self.producer_id.clone(), self.timestamp)
    }
}
