// Fare snapshot data model shared by the normalizer, store and statistics engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Travel mode a route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Flight,
    Train,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Flight => "flight",
            Mode::Train => "train",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid mode '{0}' (expected flight or train)")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flight" => Ok(Mode::Flight),
            "train" => Ok(Mode::Train),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

// One observed price point for a route on a given snapshot date.
//
// Rows are immutable once stored. `price` is `None` when the provider did not
// resolve a fare, and is never negative when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareRecord {
    pub mode: Mode,
    pub origin_code: String,
    pub destination_code: String,
    pub snapshot_date: NaiveDate,
    pub price: Option<f64>,
    pub carrier_or_train_identifier: Option<String>,
    pub fare_class: Option<String>,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub arrival: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

impl FareRecord {
    // Bare record for a route; descriptive fields start out absent
    pub fn new(
        mode: Mode,
        origin_code: impl Into<String>,
        destination_code: impl Into<String>,
        snapshot_date: NaiveDate,
        price: Option<f64>,
    ) -> Self {
        Self {
            mode,
            origin_code: origin_code.into(),
            destination_code: destination_code.into(),
            snapshot_date,
            price,
            carrier_or_train_identifier: None,
            fare_class: None,
            departure: None,
            arrival: None,
            availability: None,
        }
    }
}

// Aggregates over a route's price history. Every price field is None when no
// priced observation exists, so "no data" never reads as a zero fare.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistics {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub mean_price: Option<f64>,
    pub std_dev_price: Option<f64>,
    pub cheapest_date: Option<NaiveDate>,
    pub sample_size: usize,
}

impl RouteStatistics {
    pub fn is_empty(&self) -> bool {
        self.sample_size == 0
    }
}

// A single (date, price) point on a route's trend line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarePoint {
    pub snapshot_date: NaiveDate,
    pub price: Option<f64>,
}

impl From<&FareRecord> for FarePoint {
    fn from(record: &FareRecord) -> Self {
        Self {
            snapshot_date: record.snapshot_date,
            price: record.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationCount {
    pub code: String,
    pub count: usize,
}
