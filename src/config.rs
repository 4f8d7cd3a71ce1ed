// Service configuration, read from the environment (optionally via .env)

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{
    AdapterPolicy, AviationStackAdapter, FixtureAdapter, FlightScraperSkyAdapter, ProviderSet,
    RetryConfig,
};
use crate::store::DEFAULT_TABLE;
use crate::summary::DEFAULT_GEMINI_MODEL;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

// Limits applied by the request handler
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub history_limit: usize,
    pub trend_limit: usize,
    pub lookback_days: i64,
    pub top_destinations: usize,
    pub insights_sample: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            trend_limit: 60,
            lookback_days: 60,
            top_destinations: 5,
            insights_sample: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableApiConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_port: u16,
    pub table: String,
    pub settings: ServiceSettings,
    pub provider_timeout_ms: u64,
    pub retry_config: RetryConfig,
    pub aviationstack_api_key: Option<String>,
    pub rapidapi_key: Option<String>,
    pub use_fixture_providers: bool,
    pub table_api: Option<TableApiConfig>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            table: DEFAULT_TABLE.to_string(),
            settings: ServiceSettings::default(),
            provider_timeout_ms: 5000,
            retry_config: RetryConfig::default(),
            aviationstack_api_key: None,
            rapidapi_key: None,
            use_fixture_providers: false,
            table_api: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<bool, ConfigError> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
        }),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let table_api = match (
            secret(&lookup, "SUPABASE_URL"),
            secret(&lookup, "SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Some(url), Some(service_key)) => Some(TableApiConfig { url, service_key }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete("SUPABASE_URL", "SUPABASE_SERVICE_ROLE_KEY"))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete("SUPABASE_SERVICE_ROLE_KEY", "SUPABASE_URL"))
            }
            (None, None) => None,
        };

        let retry_config = RetryConfig {
            max_retries: parsed(&lookup, "PROVIDER_MAX_RETRIES", defaults.retry_config.max_retries)?,
            ..defaults.retry_config
        };

        Ok(Self {
            http_port: parsed(&lookup, "HTTP_PORT", defaults.http_port)?,
            table: secret(&lookup, "FARE_TABLE").unwrap_or(defaults.table),
            settings: ServiceSettings {
                history_limit: parsed(&lookup, "HISTORY_LIMIT", defaults.settings.history_limit)?,
                trend_limit: parsed(&lookup, "TREND_LIMIT", defaults.settings.trend_limit)?,
                ..defaults.settings
            },
            provider_timeout_ms: parsed(&lookup, "PROVIDER_TIMEOUT_MS", defaults.provider_timeout_ms)?,
            retry_config,
            aviationstack_api_key: secret(&lookup, "AVIATIONSTACK_API_KEY"),
            rapidapi_key: secret(&lookup, "RAPIDAPI_KEY"),
            use_fixture_providers: flag(&lookup, "USE_FIXTURE_PROVIDERS")?,
            table_api,
            gemini_api_key: secret(&lookup, "GEMINI_API_KEY"),
            gemini_model: secret(&lookup, "GEMINI_MODEL").unwrap_or(defaults.gemini_model),
        })
    }

    pub fn adapter_policy(&self) -> AdapterPolicy {
        AdapterPolicy {
            timeout: Duration::from_millis(self.provider_timeout_ms),
            retry: self.retry_config.clone(),
        }
    }

    // Adapters enabled by the configured credentials. Demo fixtures are
    // served when asked for, or when no live provider is configured.
    pub fn provider_set(&self) -> ProviderSet {
        let policy = self.adapter_policy();
        let mut providers = ProviderSet::new();

        if let Some(key) = &self.aviationstack_api_key {
            providers = providers.with(Arc::new(AviationStackAdapter::new(key.clone(), policy.clone())));
        }
        if let Some(key) = &self.rapidapi_key {
            providers = providers.with(Arc::new(FlightScraperSkyAdapter::new(key.clone(), policy)));
        }

        if self.use_fixture_providers {
            providers = providers.with(Arc::new(FixtureAdapter::demo()));
        } else if providers.is_empty() {
            warn!("No provider credentials configured, serving demo fixtures");
            providers = providers.with(Arc::new(FixtureAdapter::demo()));
        }

        info!("Providers enabled: {}", providers.names().join(", "));
        providers
    }
}
