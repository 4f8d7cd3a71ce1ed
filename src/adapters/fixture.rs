// Adapter serving fixed records, for demo runs without provider credentials

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{FetchRequest, ProviderAdapter};
use crate::fare::Mode;
use crate::provider::{FlightOffer, ProviderRecord, TrainClass, TrainService};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FixtureKey {
    mode: Mode,
    // None matches any route
    route: Option<(String, String)>,
}

// Records keyed by mode and optionally route. A route-specific entry wins over
// the mode-wide default.
pub struct FixtureAdapter {
    name: String,
    fixtures: DashMap<FixtureKey, Vec<ProviderRecord>>,
    calls: AtomicUsize,
}

impl FixtureAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixtures: DashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_default(self, mode: Mode, records: Vec<ProviderRecord>) -> Self {
        self.fixtures.insert(FixtureKey { mode, route: None }, records);
        self
    }

    pub fn with_route(
        self,
        mode: Mode,
        origin_code: &str,
        destination_code: &str,
        records: Vec<ProviderRecord>,
    ) -> Self {
        let route = Some((
            origin_code.to_ascii_uppercase(),
            destination_code.to_ascii_uppercase(),
        ));
        self.fixtures.insert(FixtureKey { mode, route }, records);
        self
    }

    // How many times fetch has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    // Sample availability for both modes: two flight cabins and one express
    // train with every bookable class.
    pub fn demo() -> Self {
        let flight = |airline: &str, number: &str, cabin: &str, price: f64| {
            ProviderRecord::Flight(FlightOffer {
                provider: "demo".to_string(),
                flight_number: Some(number.to_string()),
                airline: Some(airline.to_string()),
                cabin: Some(cabin.to_string()),
                price: Some(price),
                status: Some("scheduled".to_string()),
                ..Default::default()
            })
        };
        let class = |code: &str, seats: u32, fare: f64| TrainClass {
            class_code: code.to_string(),
            availability: Some(format!("AVL {}", seats)),
            fare: Some(fare),
        };

        Self::new("demo")
            .with_default(
                Mode::Flight,
                vec![
                    flight("IndiGo", "6E2134", "Economy", 4500.0),
                    flight("Air India", "AI887", "Business", 12000.0),
                ],
            )
            .with_default(
                Mode::Train,
                vec![ProviderRecord::Train(TrainService {
                    provider: "demo".to_string(),
                    train_number: Some("12345".to_string()),
                    train_name: Some("12345 Express".to_string()),
                    departure: Some("06:10".to_string()),
                    arrival: Some("21:45".to_string()),
                    classes: vec![
                        class("SL", 30, 500.0),
                        class("3A", 10, 1200.0),
                        class("2A", 5, 2000.0),
                        class("1A", 2, 4000.0),
                    ],
                })],
            )
    }
}

#[async_trait]
impl ProviderAdapter for FixtureAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, mode: Mode) -> bool {
        self.fixtures.iter().any(|entry| entry.key().mode == mode)
    }

    async fn fetch(&self, request: &FetchRequest) -> Vec<ProviderRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let route_key = FixtureKey {
            mode: request.mode,
            route: Some((
                request.origin_code.to_ascii_uppercase(),
                request.destination_code.to_ascii_uppercase(),
            )),
        };
        let default_key = FixtureKey {
            mode: request.mode,
            route: None,
        };

        let records = self
            .fixtures
            .get(&route_key)
            .or_else(|| self.fixtures.get(&default_key))
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        debug!("{} serving {} fixture records", self.name, records.len());
        records
    }
}
