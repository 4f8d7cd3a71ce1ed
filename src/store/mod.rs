// Snapshot Store: append-only fare history on top of a generic table backend

mod memory;
mod rest;

pub use memory::{InMemoryTableStore, TableStats};
pub use rest::RestTableStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::fare::{FareRecord, Mode};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Insert into {table} failed: {message}")]
    InsertFailed { table: String, message: String },

    #[error("Query on {table} failed: {message}")]
    QueryFailed { table: String, message: String },

    #[error("Batch declared as {expected} contains a {found} record")]
    InconsistentMode { expected: Mode, found: Mode },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid row data: {0}")]
    InvalidData(String),
}

// Columns the snapshot history can be filtered and ordered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Mode,
    OriginCode,
    DestinationCode,
    SnapshotDate,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Mode => "mode",
            Column::OriginCode => "origin_code",
            Column::DestinationCode => "destination_code",
            Column::SnapshotDate => "snapshot_date",
        }
    }

    // Value of this column for a row, in its wire representation. ISO dates
    // compare chronologically as strings.
    pub fn value_of(&self, record: &FareRecord) -> String {
        match self {
            Column::Mode => record.mode.as_str().to_string(),
            Column::OriginCode => record.origin_code.clone(),
            Column::DestinationCode => record.destination_code.clone(),
            Column::SnapshotDate => record.snapshot_date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Column, String),
    Gte(Column, String),
}

impl Filter {
    pub fn matches(&self, record: &FareRecord) -> bool {
        match self {
            Filter::Eq(column, value) => column.value_of(record) == *value,
            Filter::Gte(column, value) => column.value_of(record).as_str() >= value.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy {
    pub column: Column,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: Column, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(column, value.into()));
        self
    }

    pub fn gte(mut self, column: Column, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Gte(column, value.into()));
        self
    }

    pub fn order_by(mut self, column: Column, ascending: bool) -> Self {
        self.order_by = Some(OrderBy { column, ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// Generic append-only table operations the snapshot history is kept in.
//
// A failed `insert_batch` means the whole batch failed; backends do not
// report partial success.
#[async_trait]
pub trait PersistentStore: Send + Sync + 'static {
    async fn insert_batch(&self, table: &str, rows: &[FareRecord]) -> Result<(), StorageError>;

    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<FareRecord>, StorageError>;
}

pub const DEFAULT_TABLE: &str = "fare_history";

pub struct SnapshotStore {
    backend: Arc<dyn PersistentStore>,
    table: String,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn PersistentStore>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // Append a batch of normalized records. Returns the number of rows written.
    //
    // An empty batch is a successful no-op and never reaches the backend.
    // Backend failures are returned as-is; the caller decides what to do.
    pub async fn append(&self, records: &[FareRecord]) -> Result<usize, StorageError> {
        if records.is_empty() {
            debug!("Nothing to store in {}", self.table);
            return Ok(0);
        }

        match self.backend.insert_batch(&self.table, records).await {
            Ok(()) => {
                info!("Stored {} fare snapshots in {}", records.len(), self.table);
                Ok(records.len())
            }
            Err(e) => {
                error!("Failed to store {} snapshots in {}: {}", records.len(), self.table, e);
                Err(e)
            }
        }
    }

    // Same as append, but refuses a batch that does not match the query's mode
    pub async fn append_for_mode(
        &self,
        mode: Mode,
        records: &[FareRecord],
    ) -> Result<usize, StorageError> {
        if let Some(stray) = records.iter().find(|r| r.mode != mode) {
            return Err(StorageError::InconsistentMode {
                expected: mode,
                found: stray.mode,
            });
        }
        self.append(records).await
    }

    // Newest rows first from the backend, handed back oldest first
    async fn latest(&self, query: TableQuery, limit: usize) -> Result<Vec<FareRecord>, StorageError> {
        let query = query.order_by(Column::SnapshotDate, false).limit(limit);
        let mut rows = self.backend.query(&self.table, &query).await?;
        rows.reverse();
        Ok(rows)
    }

    // The most recent `limit` snapshots for one route, oldest first
    pub async fn history(
        &self,
        mode: Mode,
        origin_code: &str,
        destination_code: &str,
        limit: usize,
    ) -> Result<Vec<FareRecord>, StorageError> {
        let query = TableQuery::new()
            .eq(Column::Mode, mode.as_str())
            .eq(Column::OriginCode, origin_code)
            .eq(Column::DestinationCode, destination_code);
        self.latest(query, limit).await
    }

    pub async fn snapshots_since(
        &self,
        mode: Option<Mode>,
        since: NaiveDate,
        limit: usize,
    ) -> Result<Vec<FareRecord>, StorageError> {
        let mut query = TableQuery::new();
        if let Some(mode) = mode {
            query = query.eq(Column::Mode, mode.as_str());
        }
        let query = query.gte(Column::SnapshotDate, since.format("%Y-%m-%d").to_string());
        self.latest(query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    fn record(mode: Mode, dest: &str, d: u32, price: f64) -> FareRecord {
        FareRecord::new(mode, "DEL", dest, day(d), Some(price))
    }

    fn store() -> (Arc<InMemoryTableStore>, SnapshotStore) {
        let backend = Arc::new(InMemoryTableStore::new());
        let store = SnapshotStore::new(backend.clone(), DEFAULT_TABLE);
        (backend, store)
    }

    #[tokio::test]
    async fn test_empty_append_skips_backend() {
        let (backend, store) = store();

        let written = store.append(&[]).await.unwrap();

        assert_eq!(written, 0);
        assert_eq!(backend.stats().insert_calls, 0);
    }

    #[tokio::test]
    async fn test_append_then_history_in_date_order() {
        let (backend, store) = store();
        store
            .append(&[
                record(Mode::Flight, "BOM", 3, 5100.0),
                record(Mode::Flight, "BOM", 1, 4800.0),
                record(Mode::Flight, "GOI", 2, 6100.0),
                record(Mode::Train, "BOM", 2, 900.0),
            ])
            .await
            .unwrap();

        let history = store.history(Mode::Flight, "DEL", "BOM", 100).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|r| r.snapshot_date).collect();
        assert_eq!(dates, vec![day(1), day(3)]);
        assert_eq!(backend.stats().insert_calls, 1);
        assert_eq!(backend.stats().rows, 4);
    }

    #[tokio::test]
    async fn test_history_keeps_newest_within_limit() {
        let (_, store) = store();
        let batch: Vec<FareRecord> = (1..=10).map(|d| record(Mode::Flight, "BOM", d, 100.0)).collect();
        store.append(&batch).await.unwrap();

        let history = store.history(Mode::Flight, "DEL", "BOM", 4).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|r| r.snapshot_date).collect();
        assert_eq!(dates, vec![day(7), day(8), day(9), day(10)]);
    }

    #[tokio::test]
    async fn test_snapshots_since_keeps_newest_within_limit() {
        let (_, store) = store();
        let batch: Vec<FareRecord> = (1..=6).map(|d| record(Mode::Train, "BCT", d, 700.0)).collect();
        store.append(&batch).await.unwrap();

        let recent = store.snapshots_since(Some(Mode::Train), day(2), 3).await.unwrap();
        let dates: Vec<NaiveDate> = recent.iter().map(|r| r.snapshot_date).collect();
        assert_eq!(dates, vec![day(4), day(5), day(6)]);
    }

    #[tokio::test]
    async fn test_mixed_mode_batch_is_rejected_before_write() {
        let (backend, store) = store();
        let batch = vec![
            record(Mode::Flight, "BOM", 1, 4800.0),
            record(Mode::Train, "BOM", 1, 700.0),
        ];

        let result = store.append_for_mode(Mode::Flight, &batch).await;

        assert!(matches!(
            result,
            Err(StorageError::InconsistentMode {
                expected: Mode::Flight,
                found: Mode::Train
            })
        ));
        assert_eq!(backend.stats().insert_calls, 0);
    }

    #[tokio::test]
    async fn test_snapshots_since() {
        let (_, store) = store();
        store
            .append(&[
                record(Mode::Flight, "BOM", 1, 1.0),
                record(Mode::Flight, "GOI", 10, 1.0),
                record(Mode::Train, "BLR", 12, 1.0),
            ])
            .await
            .unwrap();

        let all = store.snapshots_since(None, day(5), 100).await.unwrap();
        assert_eq!(all.len(), 2);

        let trains = store.snapshots_since(Some(Mode::Train), day(5), 100).await.unwrap();
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0].destination_code, "BLR");
    }

    #[test]
    fn test_filter_matching() {
        let r = record(Mode::Flight, "BOM", 15, 1.0);
        assert!(Filter::Eq(Column::Mode, "flight".to_string()).matches(&r));
        assert!(!Filter::Eq(Column::DestinationCode, "GOI".to_string()).matches(&r));
        assert!(Filter::Gte(Column::SnapshotDate, "2025-09-15".to_string()).matches(&r));
        assert!(!Filter::Gte(Column::SnapshotDate, "2025-09-16".to_string()).matches(&r));
    }
}
