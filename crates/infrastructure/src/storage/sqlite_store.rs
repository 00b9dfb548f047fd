use async_trait::async_trait;
use domain::DomainError;
use domain::storage::{DataRecord, ProducerId, TimeIndexedStore, TimeRange};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

/// SQLite-backed store.
///
/// One row per `(producer_id, timestamp)`; payloads are kept as JSON text.
#[derive(Clone)]
pub struct SqliteTimeStore {
    pool: Pool<Sqlite>,
}

fn storage_error(e: sqlx::Error) -> DomainError {
    DomainError::Storage(e.to_string())
}

fn decode_record(row: &SqliteRow) -> Result<DataRecord, DomainError> {
    let producer_id: String = row.try_get("producer_id").map_err(storage_error)?;
    let timestamp: i64 = row.try_get("timestamp").map_err(storage_error)?;
    let data: String = row.try_get("data").map_err(storage_error)?;

    let producer_id = ProducerId::new(producer_id)
        .map_err(|e| DomainError::Storage(format!("Corrupt producer id: {}", e)))?;
    let data = serde_json::from_str(&data)
        .map_err(|e| DomainError::Storage(format!("Corrupt payload: {}", e)))?;

    Ok(DataRecord::new(producer_id, timestamp, data))
}

impl SqliteTimeStore {
    /// Open (or create) the database at `url`, e.g. `sqlite::memory:` or
    /// `sqlite://archive.db?mode=rwc`
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1) // SQLite is single-writer
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await
            .map_err(storage_error)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                producer_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (producer_id, timestamp)
            )",
        )
        .execute(&pool)
        .await
        .map_err(storage_error)?;

        tracing::info!(url = %url, "SQLite time store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl TimeIndexedStore for SqliteTimeStore {
    async fn put(&self, record: DataRecord) -> Result<(), DomainError> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| DomainError::Storage(format!("Cannot encode payload: {}", e)))?;

        sqlx::query("INSERT OR REPLACE INTO records (producer_id, timestamp, data) VALUES (?, ?, ?)")
            .bind(record.producer_id.as_str())
            .bind(record.timestamp)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn producer_ids(&self) -> Result<Vec<ProducerId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT DISTINCT producer_id FROM records")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        ids.into_iter()
            .map(|id| {
                ProducerId::new(id)
                    .map_err(|e| DomainError::Storage(format!("Corrupt producer id: {}", e)))
            })
            .collect()
    }

    async fn time_range(&self) -> Result<TimeRange, DomainError> {
        let (min, max): (Option<i64>, Option<i64>) =
            sqlx::query_as("SELECT MIN(timestamp), MAX(timestamp) FROM records")
                .fetch_one(&self.pool)
                .await
                .map_err(storage_error)?;
        Ok(TimeRange::from_bounds(min, max))
    }

    async fn time_range_for(&self, producer_id: &ProducerId) -> Result<TimeRange, DomainError> {
        let (min, max): (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT MIN(timestamp), MAX(timestamp) FROM records WHERE producer_id = ?",
        )
        .bind(producer_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(TimeRange::from_bounds(min, max))
    }

    async fn range(
        &self,
        producer_id: &ProducerId,
        range: TimeRange,
    ) -> Result<Vec<DataRecord>, DomainError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT producer_id, timestamp, data FROM records
             WHERE producer_id = ? AND timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp ASC",
        )
        .bind(producer_id.as_str())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(decode_record).collect()
    }

    async fn range_all(&self, range: TimeRange) -> Result<Vec<DataRecord>, DomainError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT producer_id, timestamp, data FROM records
             WHERE timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp ASC, producer_id ASC",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(decode_record).collect()
    }

    async fn record_count(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }
}
