// Raw provider payloads, validated into one shape per travel mode

use serde::{Deserialize, Serialize};

use crate::fare::Mode;

// Provider records, one explicit shape per mode. Adapters validate upstream
// payloads into these before the normalizer sees them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProviderRecord {
    Flight(FlightOffer),
    Train(TrainService),
}

impl ProviderRecord {
    pub fn mode(&self) -> Mode {
        match self {
            ProviderRecord::Flight(_) => Mode::Flight,
            ProviderRecord::Train(_) => Mode::Train,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FlightOffer {
    pub provider: String,
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub cabin: Option<String>,
    pub price: Option<f64>,
    pub status: Option<String>,
}

impl FlightOffer {
    // Fill the gaps in self from another provider's view of the same flight
    pub fn merge_from(&mut self, other: FlightOffer) {
        if !self.provider.split('+').any(|p| p == other.provider) {
            self.provider = format!("{}+{}", self.provider, other.provider);
        }
        self.airline = self.airline.take().or(other.airline);
        self.departure = self.departure.take().or(other.departure);
        self.arrival = self.arrival.take().or(other.arrival);
        self.cabin = self.cabin.take().or(other.cabin);
        self.price = self.price.or(other.price);
        self.status = self.status.take().or(other.status);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrainService {
    pub provider: String,
    pub train_number: Option<String>,
    pub train_name: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub classes: Vec<TrainClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TrainClass {
    pub class_code: String,
    pub availability: Option<String>,
    pub fare: Option<f64>,
}

// Parse a provider price that may arrive as text ("₹ 1,205", "4500.00") or as
// a number. Anything that is not a finite, non-negative amount is unknown.
pub fn parse_fare(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

pub fn fare_from_json(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        serde_json::Value::String(s) => parse_fare(s),
        _ => None,
    }
}
