use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use domain::DomainError;
use domain::storage::{DataRecord, ProducerId, TimeIndexedStore, TimeRange};
use tokio::sync::RwLock;

/// Volatile store keeping one ordered map per producer
#[derive(Default)]
pub struct InMemoryTimeStore {
    records: RwLock<HashMap<ProducerId, BTreeMap<i64, DataRecord>>>,
}

impl InMemoryTimeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn span(series: &BTreeMap<i64, DataRecord>) -> TimeRange {
    TimeRange::from_bounds(
        series.keys().next().copied(),
        series.keys().next_back().copied(),
    )
}

#[async_trait]
impl TimeIndexedStore for InMemoryTimeStore {
    async fn put(&self, record: DataRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        records
            .entry(record.producer_id.clone())
            .or_default()
            .insert(record.timestamp, record);
        Ok(())
    }

    async fn producer_ids(&self) -> Result<Vec<ProducerId>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn time_range(&self) -> Result<TimeRange, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .map(span)
            .fold(TimeRange::EMPTY, TimeRange::union))
    }

    async fn time_range_for(&self, producer_id: &ProducerId) -> Result<TimeRange, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(producer_id).map_or(TimeRange::EMPTY, span))
    }

    async fn range(
        &self,
        producer_id: &ProducerId,
        range: TimeRange,
    ) -> Result<Vec<DataRecord>, DomainError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        Ok(records
            .get(producer_id)
            .map(|series| {
                series
                    .range(range.start..=range.end)
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn range_all(&self, range: TimeRange) -> Result<Vec<DataRecord>, DomainError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        let mut matching: Vec<DataRecord> = records
            .values()
            .flat_map(|series| series.range(range.start..=range.end))
            .map(|(_, record)| record.clone())
            .collect();
        matching.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.producer_id.cmp(&b.producer_id))
        });
        Ok(matching)
    }

    async fn record_count(&self) -> Result<u64, DomainError> {
        let records = self.records.read().await;
        Ok(records.values().map(|series| series.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_producer_has_empty_range() {
        let store = InMemoryTimeStore::new();
        let producer = ProducerId::new("never-seen").unwrap();

        assert_eq!(store.time_range_for(&producer).await.unwrap(), TimeRange::EMPTY);
        assert!(store.range(&producer, TimeRange::ALL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_count_ignores_overwrites() {
        let store = InMemoryTimeStore::new();
        let producer = ProducerId::new("p1").unwrap();

        store
            .put(DataRecord::new(producer.clone(), 10, json!(1)))
            .await
            .unwrap();
        store
            .put(DataRecord::new(producer, 10, json!(2)))
            .await
            .unwrap();

        assert_eq!(store.record_count().await.unwrap(), 1);
    }
}
