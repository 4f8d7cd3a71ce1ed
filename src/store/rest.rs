// HTTP table backend speaking the PostgREST dialect (`/rest/v1/{table}`)

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{Filter, PersistentStore, StorageError, TableQuery};
use crate::fare::FareRecord;

#[derive(Debug, Clone)]
pub struct RestTableStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestTableStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

// Translate a table query into PostgREST query-string parameters
pub(crate) fn query_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        let (column, value) = match filter {
            Filter::Eq(column, value) => (column, format!("eq.{}", value)),
            Filter::Gte(column, value) => (column, format!("gte.{}", value)),
        };
        params.push((column.name().to_string(), value));
    }
    if let Some(order) = query.order_by {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push((
            "order".to_string(),
            format!("{}.{}", order.column.name(), direction),
        ));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl PersistentStore for RestTableStore {
    async fn insert_batch(&self, table: &str, rows: &[FareRecord]) -> Result<(), StorageError> {
        let url = self.table_url(table);
        debug!("Inserting {} rows via {}", rows.len(), url);

        let response = self
            .authorized(self.http.post(&url))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::InsertFailed {
                table: table.to_string(),
                message: format!("status {}: {}", status, response.text().await.unwrap_or_default()),
            });
        }
        Ok(())
    }

    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<FareRecord>, StorageError> {
        let url = self.table_url(table);
        let params = query_params(query);
        debug!("Querying {} with {:?}", url, params);

        let response = self
            .authorized(self.http.get(&url))
            .query(&params)
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::QueryFailed {
                table: table.to_string(),
                message: format!("status {}: {}", status, response.text().await.unwrap_or_default()),
            });
        }

        response
            .json::<Vec<FareRecord>>()
            .await
            .map_err(|e| StorageError::InvalidData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Column;

    #[test]
    fn test_query_params() {
        let query = TableQuery::new()
            .eq(Column::Mode, "flight")
            .eq(Column::OriginCode, "DEL")
            .gte(Column::SnapshotDate, "2025-07-01")
            .order_by(Column::SnapshotDate, true)
            .limit(60);

        let params = query_params(&query);
        let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("select", "*"),
                ("mode", "eq.flight"),
                ("origin_code", "eq.DEL"),
                ("snapshot_date", "gte.2025-07-01"),
                ("order", "snapshot_date.asc"),
                ("limit", "60"),
            ]
        );
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store =
            RestTableStore::new("https://db.example.co/", "key", Duration::from_secs(1)).unwrap();
        assert_eq!(store.table_url("fare_history"), "https://db.example.co/rest/v1/fare_history");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_storage_error() {
        let store = RestTableStore::new("http://127.0.0.1:9", "key", Duration::from_millis(200)).unwrap();
        let result = store.query("fare_history", &TableQuery::new()).await;
        assert!(matches!(result, Err(StorageError::NetworkError(_))));
    }
}
