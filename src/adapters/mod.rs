// Provider adapters.
//
// Each adapter wraps one upstream source and validates its payload into
// `ProviderRecord`s. Adapters never fail the caller: upstream errors are
// logged at this boundary and turn into an empty result.

mod aviationstack;
mod fixture;
mod flight_scraper_sky;
mod retry;

pub use aviationstack::AviationStackAdapter;
pub use fixture::FixtureAdapter;
pub use flight_scraper_sky::FlightScraperSkyAdapter;
pub use retry::{calculate_backoff, fetch_with_policy, AdapterError, AdapterPolicy, RetryConfig};

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::fare::Mode;
use crate::provider::ProviderRecord;

// What an adapter is asked for
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub mode: Mode,
    pub origin_code: String,
    pub destination_code: String,
    pub date: NaiveDate,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn supports(&self, mode: Mode) -> bool;

    // May return an empty sequence; never an error
    async fn fetch(&self, request: &FetchRequest) -> Vec<ProviderRecord>;
}

// The adapters registered for the service.
//
// All adapters supporting the requested mode are queried concurrently and
// their results merged; providers are independent and read-only, so no
// ordering between them is assumed.
#[derive(Clone, Default)]
pub struct ProviderSet {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    pub async fn fetch_all(&self, request: &FetchRequest) -> Vec<ProviderRecord> {
        let active: Vec<&Arc<dyn ProviderAdapter>> = self
            .adapters
            .iter()
            .filter(|adapter| adapter.supports(request.mode))
            .collect();

        if active.is_empty() {
            warn!("No provider registered for {} searches", request.mode);
            return Vec::new();
        }

        let results = join_all(active.iter().map(|adapter| async move {
            let records = adapter.fetch(request).await;
            (adapter.name().to_string(), records)
        }))
        .await;

        let mut batches = Vec::with_capacity(results.len());
        for (name, records) in results {
            let (matching, stray): (Vec<_>, Vec<_>) = records
                .into_iter()
                .partition(|record| record.mode() == request.mode);
            if !stray.is_empty() {
                warn!(
                    "{} returned {} records for the wrong mode, dropping them",
                    name,
                    stray.len()
                );
            }
            batches.push(matching);
        }

        let merged = merge_provider_results(batches);
        info!(
            "Fetched {} {} records for {}->{} on {}",
            merged.len(),
            request.mode,
            request.origin_code,
            request.destination_code,
            request.date
        );
        merged
    }
}

fn flight_key(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

// Join per-provider batches. Flight offers that share a flight number are
// combined into one offer (schedule from one provider, price from another);
// everything else passes through in arrival order.
pub fn merge_provider_results(batches: Vec<Vec<ProviderRecord>>) -> Vec<ProviderRecord> {
    let mut merged: Vec<ProviderRecord> = Vec::new();
    let mut by_flight_number: HashMap<String, usize> = HashMap::new();

    for record in batches.into_iter().flatten() {
        match record {
            ProviderRecord::Flight(offer) => {
                let key = offer
                    .flight_number
                    .as_deref()
                    .map(flight_key)
                    .filter(|k| !k.is_empty());
                match key {
                    Some(key) => match by_flight_number.get(&key) {
                        Some(&index) => {
                            if let ProviderRecord::Flight(existing) = &mut merged[index] {
                                existing.merge_from(offer);
                            }
                        }
                        None => {
                            by_flight_number.insert(key, merged.len());
                            merged.push(ProviderRecord::Flight(offer));
                        }
                    },
                    None => merged.push(ProviderRecord::Flight(offer)),
                }
            }
            other => merged.push(other),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FlightOffer, TrainClass, TrainService};

    fn request(mode: Mode) -> FetchRequest {
        FetchRequest {
            mode,
            origin_code: "DEL".to_string(),
            destination_code: "BOM".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
        }
    }

    fn offer(provider: &str, number: Option<&str>, price: Option<f64>) -> ProviderRecord {
        ProviderRecord::Flight(FlightOffer {
            provider: provider.to_string(),
            flight_number: number.map(str::to_string),
            price,
            ..Default::default()
        })
    }

    #[test]
    fn test_merge_joins_offers_by_flight_number() {
        let schedules = vec![
            offer("aviationstack", Some("6E 2134"), None),
            offer("aviationstack", Some("AI101"), None),
            offer("aviationstack", None, None),
        ];
        let prices = vec![offer("sky", Some("6e2134"), Some(4500.0)), offer("sky", Some("UK955"), Some(6100.0))];

        let merged = merge_provider_results(vec![schedules, prices]);

        assert_eq!(merged.len(), 4);
        match &merged[0] {
            ProviderRecord::Flight(f) => {
                assert_eq!(f.price, Some(4500.0));
                assert_eq!(f.provider, "aviationstack+sky");
            }
            other => panic!("Expected flight, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_all_queries_matching_adapters_only() {
        let flights = Arc::new(
            FixtureAdapter::new("flights").with_default(Mode::Flight, vec![offer("flights", Some("AI101"), Some(5000.0))]),
        );
        let trains = Arc::new(FixtureAdapter::new("trains").with_default(
            Mode::Train,
            vec![ProviderRecord::Train(TrainService {
                provider: "trains".to_string(),
                train_number: Some("12952".to_string()),
                classes: vec![TrainClass {
                    class_code: "SL".to_string(),
                    availability: None,
                    fare: Some(500.0),
                }],
                ..Default::default()
            })],
        ));
        let set = ProviderSet::new().with(flights.clone()).with(trains.clone());

        let records = set.fetch_all(&request(Mode::Train)).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mode(), Mode::Train);
        assert_eq!(flights.calls(), 0);
        assert_eq!(trains.calls(), 1);
    }

    #[tokio::test]
    async fn test_wrong_mode_records_are_dropped() {
        // Registered for flights on this route, but serves a train record
        let confused = FixtureAdapter::new("confused").with_route(
            Mode::Flight,
            "DEL",
            "BOM",
            vec![ProviderRecord::Train(TrainService::default())],
        );
        let set = ProviderSet::new().with(Arc::new(confused));

        assert!(set.fetch_all(&request(Mode::Flight)).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_adapters_is_an_empty_result() {
        let set = ProviderSet::new();
        assert!(set.is_empty());
        assert!(set.fetch_all(&request(Mode::Flight)).await.is_empty());
    }
}
