use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use domain::event::{EventListener, SensorEvent};
use domain::storage::TimeIndexedStore;

/// Listener that archives the record carried by every `NewData` event.
/// Lifecycle events are ignored.
pub struct StorageArchiver {
    store: Arc<dyn TimeIndexedStore>,
    archived: AtomicU64,
}

impl StorageArchiver {
    pub fn new(store: Arc<dyn TimeIndexedStore>) -> Self {
        Self {
            store,
            archived: AtomicU64::new(0),
        }
    }

    /// Records written since creation
    pub fn archived_count(&self) -> u64 {
        self.archived.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<dyn TimeIndexedStore> {
        &self.store
    }
}

#[async_trait]
impl EventListener for StorageArchiver {
    async fn handle_event(
        &self,
        event: &SensorEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let SensorEvent::NewData { output, record, .. } = event {
            self.store.put(record.clone()).await?;
            self.archived.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                producer_id = %record.producer_id,
                output = %output,
                timestamp = record.timestamp,
                "Record archived"
            );
        }
        Ok(())
    }

    fn listener_name(&self) -> &str {
        "StorageArchiver"
    }
}
