// Process-local table backend

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{PersistentStore, StorageError, TableQuery};
use crate::fare::FareRecord;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TableStats {
    pub tables: usize,
    pub rows: usize,
    pub insert_calls: usize,
    pub query_calls: usize,
}

// Tables kept in memory for local runs and tests.
//
// Each batch is appended under one write lock, so readers see either none or
// all of it. Rows are never modified after insertion.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: RwLock<HashMap<String, Vec<FareRecord>>>,
    insert_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TableStats {
        let tables = self.tables.read();
        TableStats {
            tables: tables.len(),
            rows: tables.values().map(Vec::len).sum(),
            insert_calls: self.insert_calls.load(Ordering::SeqCst),
            query_calls: self.query_calls.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl PersistentStore for InMemoryTableStore {
    async fn insert_batch(&self, table: &str, rows: &[FareRecord]) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }

    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<FareRecord>, StorageError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows: Vec<FareRecord> = {
            let tables = self.tables.read();
            match tables.get(table) {
                Some(rows) => rows
                    .iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };

        if let Some(order) = query.order_by {
            // Stable, so rows sharing a key keep insertion order
            rows.sort_by(|a, b| {
                let ordering = order.column.value_of(a).cmp(&order.column.value_of(b));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fare::Mode;
    use crate::store::Column;
    use chrono::NaiveDate;

    #[test]
    fn test_descending_order_and_unknown_table() {
        let store = InMemoryTableStore::new();
        let rows: Vec<FareRecord> = [3, 1, 2]
            .iter()
            .map(|&d| {
                FareRecord::new(
                    Mode::Train,
                    "NDLS",
                    "BCT",
                    NaiveDate::from_ymd_opt(2025, 9, d).unwrap(),
                    Some(d as f64),
                )
            })
            .collect();

        tokio_test::block_on(async {
            store.insert_batch("trains", &rows).await.unwrap();

            let query = TableQuery::new().order_by(Column::SnapshotDate, false).limit(2);
            let result = store.query("trains", &query).await.unwrap();
            let prices: Vec<Option<f64>> = result.iter().map(|r| r.price).collect();
            assert_eq!(prices, vec![Some(3.0), Some(2.0)]);

            let missing = store.query("flights", &query).await.unwrap();
            assert!(missing.is_empty());
        });

        let stats = store.stats();
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.query_calls, 2);
    }
}
