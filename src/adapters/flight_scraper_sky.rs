// Flight Scraper Sky fares, served through RapidAPI

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::retry::{fetch_with_policy, AdapterError, AdapterPolicy};
use super::{FetchRequest, ProviderAdapter};
use crate::fare::Mode;
use crate::provider::{fare_from_json, FlightOffer, ProviderRecord};

const RAPIDAPI_HOST: &str = "flight-scraper-sky.p.rapidapi.com";
const PROVIDER_NAME: &str = "flight-scraper-sky";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    flights: Option<Vec<PricedFlight>>,
}

#[derive(Debug, Deserialize)]
struct PricedFlight {
    #[serde(default)]
    flight_number: Option<String>,
    #[serde(default)]
    airline: Option<String>,
    // Number or display string depending on the market
    #[serde(default)]
    price: serde_json::Value,
    #[serde(default)]
    cabin: Option<String>,
}

impl From<PricedFlight> for FlightOffer {
    fn from(flight: PricedFlight) -> Self {
        FlightOffer {
            provider: PROVIDER_NAME.to_string(),
            flight_number: flight.flight_number,
            airline: flight.airline,
            departure: None,
            arrival: None,
            cabin: flight.cabin,
            price: fare_from_json(&flight.price),
            status: None,
        }
    }
}

fn into_records(response: SearchResponse) -> Vec<ProviderRecord> {
    response
        .flights
        .unwrap_or_default()
        .into_iter()
        .map(|flight| ProviderRecord::Flight(flight.into()))
        .collect()
}

pub struct FlightScraperSkyAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: AdapterPolicy,
}

impl FlightScraperSkyAdapter {
    pub fn new(api_key: impl Into<String>, policy: AdapterPolicy) -> Self {
        Self::with_base_url(format!("https://{}", RAPIDAPI_HOST), api_key, policy)
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
        let url = format!("{}/search-flights", self.base_url);
        let date = request.date.format("%Y-%m-%d").to_string();
        debug!("Fetching fares from {}", url);

        let response = self
            .http
            .get(&url)
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .header("x-rapidapi-key", &self.api_key)
            .query(&[
                ("from", request.origin_code.as_str()),
                ("to", request.destination_code.as_str()),
                ("date", date.as_str()),
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

        Ok(into_records(response.json().await?))
    }
}

#[async_trait]
impl ProviderAdapter for FlightScraperSkyAdapter {
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
