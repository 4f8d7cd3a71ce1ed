// Request handling: validation, provider fan-out, persistence and statistics.
//
// `FareService` owns every dependency a request needs. They are built once
// at start-up and injected here, so the handler never reaches for a global
// client.

use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, field, info, instrument};

use crate::adapters::{FetchRequest, ProviderSet};
use crate::config::ServiceSettings;
use crate::fare::{DestinationCount, FarePoint, FareRecord, Mode, RouteStatistics};
use crate::normalizer::{normalize, NormalizeError, SnapshotContext};
use crate::statistics::{compute_statistics, top_destinations};
use crate::store::{SnapshotStore, StorageError};
use crate::summary::{
    build_insights_prompt, build_route_prompt, summarize, RouteContext, SummaryGenerator,
};

pub const NO_INSIGHTS_DATA: &str = "No data available for insights yet.";

// Upper bound on rows pulled for destination ranking
const RECENT_SNAPSHOT_CAP: usize = 10_000;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid mode '{0}' (expected flight or train)")]
    InvalidMode(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid {field} code '{value}'")]
    InvalidCode { field: &'static str, value: String },

    #[error("Origin and destination are both {0}")]
    SameOriginDestination(String),
}

#[derive(Error, Debug)]
pub enum FareError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl FareError {
    // HTTP status the error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            FareError::Validation(_) | FareError::Normalize(_) => 400,
            FareError::Storage(_) => 500,
        }
    }
}

// Raw query as received over HTTP. Field names from the older API
// (`type`, `from`, `to`) are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FareQuery {
    #[serde(default, alias = "type")]
    pub mode: Option<String>,
    #[serde(default, alias = "from")]
    pub origin: Option<String>,
    #[serde(default, alias = "to")]
    pub destination: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteQuery {
    pub mode: Mode,
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedQuery {
    #[serde(flatten)]
    pub route: RouteQuery,
    pub date: NaiveDate,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ValidationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn station_code(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let valid = (2..=8).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(ValidationError::InvalidCode {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_ascii_uppercase())
}

impl FareQuery {
    pub fn validate_route(&self) -> Result<RouteQuery, ValidationError> {
        let mode_raw = required(&self.mode, "mode")?;
        let origin_raw = required(&self.origin, "origin")?;
        let destination_raw = required(&self.destination, "destination")?;

        let mode: Mode = mode_raw
            .parse()
            .map_err(|_| ValidationError::InvalidMode(mode_raw.to_string()))?;
        let origin = station_code(origin_raw, "origin")?;
        let destination = station_code(destination_raw, "destination")?;
        if origin == destination {
            return Err(ValidationError::SameOriginDestination(origin));
        }

        Ok(RouteQuery {
            mode,
            origin,
            destination,
        })
    }

    pub fn validate(&self) -> Result<ValidatedQuery, ValidationError> {
        let route = self.validate_route()?;
        let date_raw = required(&self.date, "date")?;
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date_raw.to_string()))?;
        Ok(ValidatedQuery { route, date })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub query: ValidatedQuery,
    pub records: Vec<FareRecord>,
    pub statistics: RouteStatistics,
    pub stored: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsResponse {
    #[serde(flatten)]
    pub route: RouteQuery,
    pub fares: Vec<FarePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub route: RouteQuery,
    pub statistics: RouteStatistics,
    pub current_availability: Vec<FareRecord>,
    pub top_destinations: Vec<DestinationCount>,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsResponse {
    pub mode: Mode,
    pub snapshot_count: usize,
    pub insights: String,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct FareService {
    providers: ProviderSet,
    store: SnapshotStore,
    generator: Arc<dyn SummaryGenerator>,
    settings: ServiceSettings,
    clock: Clock,
}

impl FareService {
    pub fn new(
        providers: ProviderSet,
        store: SnapshotStore,
        generator: Arc<dyn SummaryGenerator>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            providers,
            store,
            generator,
            settings,
            clock: Arc::new(|| Utc::now().date_naive()),
        }
    }

    // Replace the source of "today", which stamps every new snapshot
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    async fn current_records(
        &self,
        route: &RouteQuery,
        travel_date: NaiveDate,
    ) -> Result<Vec<FareRecord>, NormalizeError> {
        let request = FetchRequest {
            mode: route.mode,
            origin_code: route.origin.clone(),
            destination_code: route.destination.clone(),
            date: travel_date,
        };
        let raw = self.providers.fetch_all(&request).await;
        let context = SnapshotContext::new(&route.origin, &route.destination, self.today());
        normalize(&raw, &context)
    }

    // Collect current fares for a route, persist them as today's snapshots and
    // report statistics over the stored history.
    //
    // Nothing is fetched or written unless the query validates. A storage
    // failure fails the request.
    #[instrument(skip(self), fields(mode = field::Empty, route = field::Empty))]
    pub async fn snapshot(&self, query: &FareQuery) -> Result<SnapshotResponse, FareError> {
        let query = query.validate()?;
        let route = &query.route;
        tracing::Span::current()
            .record("mode", route.mode.as_str())
            .record("route", format!("{}->{}", route.origin, route.destination).as_str());

        let records = self.current_records(route, query.date).await?;
        let stored = self.store.append_for_mode(route.mode, &records).await?;

        let history = self
            .store
            .history(route.mode, &route.origin, &route.destination, self.settings.history_limit)
            .await?;
        let statistics = compute_statistics(&history);

        info!(
            "Snapshot for {} {}->{}: {} records, {} stored, {} in history",
            route.mode,
            route.origin,
            route.destination,
            records.len(),
            stored,
            history.len()
        );

        Ok(SnapshotResponse {
            query,
            records,
            statistics,
            stored,
        })
    }

    // Stored price points for a route, oldest first
    pub async fn trends(&self, query: &FareQuery) -> Result<TrendsResponse, FareError> {
        let route = query.validate_route()?;
        let history = self
            .store
            .history(route.mode, &route.origin, &route.destination, self.settings.trend_limit)
            .await?;
        debug!("{} trend points for {}->{}", history.len(), route.origin, route.destination);

        Ok(TrendsResponse {
            fares: history.iter().map(FarePoint::from).collect(),
            route,
        })
    }

    // History statistics, today's availability and popular destinations for a
    // route, with a generated analysis. Today's availability is not stored.
    pub async fn summary(&self, query: &FareQuery) -> Result<SummaryResponse, FareError> {
        let route = query.validate_route()?;
        let today = self.today();

        let history = self
            .store
            .history(route.mode, &route.origin, &route.destination, self.settings.history_limit)
            .await?;
        let statistics = compute_statistics(&history);

        let current = self.current_records(&route, today).await?;

        let since = today - chrono::Duration::days(self.settings.lookback_days);
        let recent = self
            .store
            .snapshots_since(None, since, RECENT_SNAPSHOT_CAP)
            .await?;
        let top = top_destinations(&recent, self.settings.top_destinations);

        let prompt = build_route_prompt(&RouteContext {
            mode: route.mode,
            origin_code: &route.origin,
            destination_code: &route.destination,
            statistics: &statistics,
            current: &current,
            top_destinations: &top,
        });
        let analysis = summarize(self.generator.as_ref(), &prompt).await;

        Ok(SummaryResponse {
            route,
            statistics,
            current_availability: current,
            top_destinations: top,
            analysis,
        })
    }

    // Generated analysis over the last two months of one mode's snapshots
    pub async fn insights(&self, mode: Option<&str>) -> Result<InsightsResponse, FareError> {
        let raw = mode
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::MissingField("mode"))?;
        let mode: Mode = raw
            .parse()
            .map_err(|_| ValidationError::InvalidMode(raw.to_string()))?;

        let today = self.today();
        let since = today
            .checked_sub_months(Months::new(2))
            .unwrap_or(NaiveDate::MIN);
        let snapshots = self
            .store
            .snapshots_since(Some(mode), since, self.settings.history_limit)
            .await?;

        if snapshots.is_empty() {
            return Ok(InsightsResponse {
                mode,
                snapshot_count: 0,
                insights: NO_INSIGHTS_DATA.to_string(),
            });
        }

        let prompt = build_insights_prompt(mode, &snapshots, self.settings.insights_sample);
        let insights = summarize(self.generator.as_ref(), &prompt).await;

        Ok(InsightsResponse {
            mode,
            snapshot_count: snapshots.len(),
            insights,
        })
    }
}
