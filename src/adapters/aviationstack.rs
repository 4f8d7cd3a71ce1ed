// AviationStack flight schedules (no fares)

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::retry::{fetch_with_policy, AdapterError, AdapterPolicy};
use super::{FetchRequest, ProviderAdapter};
use crate::fare::Mode;
use crate::provider::{FlightOffer, ProviderRecord};

const AVIATIONSTACK_BASE_URL: &str = "http://api.aviationstack.com/v1";
const PROVIDER_NAME: &str = "aviationstack";

// Data structures for the AviationStack /flights response
#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    data: Option<Vec<ScheduledFlight>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ScheduledFlight {
    #[serde(default)]
    flight: Option<FlightIdent>,
    #[serde(default)]
    airline: Option<Airline>,
    #[serde(default)]
    departure: Option<Endpoint>,
    #[serde(default)]
    arrival: Option<Endpoint>,
    #[serde(default)]
    flight_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlightIdent {
    iata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Airline {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    scheduled: Option<String>,
}

impl From<ScheduledFlight> for FlightOffer {
    fn from(flight: ScheduledFlight) -> Self {
        FlightOffer {
            provider: PROVIDER_NAME.to_string(),
            flight_number: flight.flight.and_then(|f| f.iata),
            airline: flight.airline.and_then(|a| a.name),
            departure: flight.departure.and_then(|d| d.scheduled),
            arrival: flight.arrival.and_then(|a| a.scheduled),
            cabin: None,
            price: None,
            status: flight.flight_status,
        }
    }
}

fn into_records(response: FlightsResponse) -> Result<Vec<ProviderRecord>, AdapterError> {
    if let Some(error) = response.error {
        return Err(AdapterError::InvalidResponse(error.to_string()));
    }
    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|flight| ProviderRecord::Flight(flight.into()))
        .collect())
}

pub struct AviationStackAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: AdapterPolicy,
}

impl AviationStackAdapter {
    pub fn new(api_key: impl Into<String>, policy: AdapterPolicy) -> Self {
        Self::with_base_url(AVIATIONSTACK_BASE_URL, api_key, policy)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        policy: AdapterPolicy,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            policy,
        }
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<Vec<ProviderRecord>, AdapterError> {
        let url = format!("{}/flights", self.base_url);
        let date = request.date.format("%Y-%m-%d").to_string();
        debug!("Fetching schedules from {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("dep_iata", request.origin_code.as_str()),
                ("arr_iata", request.destination_code.as_str()),
                ("flight_date", date.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AdapterError::from_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        into_records(response.json().await?)
    }
}

#[async_trait]
impl ProviderAdapter for AviationStackAdapter {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn supports(&self, mode: Mode) -> bool {
        mode == Mode::Flight
    }

    async fn fetch(&self, request: &FetchRequest) -> Vec<ProviderRecord> {
        if !self.supports(request.mode) {
            return Vec::new();
        }
        fetch_with_policy(PROVIDER_NAME, &self.policy, || self.try_fetch(request)).await
    }
}
