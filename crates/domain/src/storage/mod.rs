mod producer_id;
mod record;
mod store;
mod time_range;

pub use producer_id::ProducerId;
pub use record::{DataRecord, StorageKey};
#[cfg(test)]
pub use store::MockTimeIndexedStore;
pub use store::TimeIndexedStore;
pub use time_range::TimeRange;

use crate::error::Result;

/// Most recent record of a producer, if any
pub async fn latest_record(
    store: &dyn TimeIndexedStore,
    producer_id: &ProducerId,
) -> Result<Option<DataRecord>> {
    let range = store.time_range_for(producer_id).await?;
    if range.is_empty() {
        return Ok(None);
    }

    let records = store
        .range(producer_id, TimeRange::new(range.end, range.end))
        .await?;
    Ok(records.into_iter().last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_latest_record_queries_upper_bound() {
        let p1 = ProducerId::new("p1").unwrap();
        let record = DataRecord::new(p1.clone(), 30, json!({"v": 3}));

        let mut store = MockTimeIndexedStore::new();
        store
            .expect_time_range_for()
            .with(eq(p1.clone()))
            .returning(|_| Ok(TimeRange::new(10, 30)));
        let returned = record.clone();
        store
            .expect_range()
            .with(eq(p1.clone()), eq(TimeRange::new(30, 30)))
            .times(1)
            .returning(move |_, _| Ok(vec![returned.clone()]));

        let latest = latest_record(&store, &p1).await.unwrap();
        assert_eq!(latest, Some(record));
    }

    #[tokio::test]
    async fn test_latest_record_skips_query_for_empty_producer() {
        let p1 = ProducerId::new("p1").unwrap();

        let mut store = MockTimeIndexedStore::new();
        store
            .expect_time_range_for()
            .returning(|_| Ok(TimeRange::EMPTY));
        store.expect_range().never();

        assert_eq!(latest_record(&store, &p1).await.unwrap(), None);
    }
}
