use async_trait::async_trait;

use super::{DataRecord, ProducerId, TimeRange};
use crate::DomainError;

/// Time-indexed archive of records from many producers.
///
/// Records are immutable once stored; writing a key that already exists
/// replaces the earlier record (last write wins). Implementations must allow
/// concurrent readers while one writer appends.
///
/// A producer that was never seen and a producer with no records are
/// indistinguishable: both report [`TimeRange::EMPTY`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeIndexedStore: Send + Sync {
    /// Store a record under `(producer_id, timestamp)`
    async fn put(&self, record: DataRecord) -> Result<(), DomainError>;

    /// Distinct producers with at least one record, in no particular order
    async fn producer_ids(&self) -> Result<Vec<ProducerId>, DomainError>;

    /// `[min, max]` timestamp across all records, or `EMPTY`
    async fn time_range(&self) -> Result<TimeRange, DomainError>;

    /// `[min, max]` timestamp of one producer, or `EMPTY`
    async fn time_range_for(&self, producer_id: &ProducerId) -> Result<TimeRange, DomainError>;

    /// Records of one producer inside `range` (inclusive), oldest first.
    /// An empty range yields an empty result.
    async fn range(
        &self,
        producer_id: &ProducerId,
        range: TimeRange,
    ) -> Result<Vec<DataRecord>, DomainError>;

    /// Records of every producer inside `range`, ordered by timestamp then
    /// producer
    async fn range_all(&self, range: TimeRange) -> Result<Vec<DataRecord>, DomainError>;

    async fn record_count(&self) -> Result<u64, DomainError>;
}
