// Bounded retry with exponential backoff for provider calls. Providers fail
// open: once attempts are exhausted the caller gets an empty result.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::ProviderRecord;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::NetworkError(_) | AdapterError::Timeout(_) => true,
            AdapterError::ApiResponseError { is_retryable, .. } => *is_retryable,
            AdapterError::InvalidResponse(_) => false,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        AdapterError::ApiResponseError {
            status_code: status.as_u16(),
            message,
            is_retryable: status.is_server_error()
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AdapterError::Timeout(0)
        } else if e.is_decode() {
            AdapterError::InvalidResponse(e.to_string())
        } else {
            AdapterError::NetworkError(e.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 200,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

// Per-attempt timeout plus retry schedule for one adapter
#[derive(Debug, Clone)]
pub struct AdapterPolicy {
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for AdapterPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retry: RetryConfig::default(),
        }
    }
}

pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    // Jitter spreads retries from concurrent requests
    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

// Run `attempt` under the policy and return its records, or an empty result
// once it has failed `max_retries + 1` times or returned a permanent error.
pub async fn fetch_with_policy<F, Fut>(
    provider: &str,
    policy: &AdapterPolicy,
    mut attempt: F,
) -> Vec<ProviderRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<ProviderRecord>, AdapterError>>,
{
    let max_attempts = policy.retry.max_retries + 1;

    for attempt_no in 0..max_attempts {
        let outcome = match tokio::time::timeout(policy.timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(policy.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(records) => {
                debug!("{} returned {} records", provider, records.len());
                return records;
            }
            Err(e) if !e.is_retryable() => {
                warn!("{} failed permanently, returning no results: {}", provider, e);
                return Vec::new();
            }
            Err(e) => {
                if attempt_no + 1 == max_attempts {
                    warn!(
                        "{} failed after {} attempts, returning no results: {}",
                        provider, max_attempts, e
                    );
                    break;
                }
                let backoff = calculate_backoff(attempt_no, &policy.retry);
                debug!(
                    "{} attempt {} failed ({}), retrying in {:?}",
                    provider,
                    attempt_no + 1,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    Vec::new()
}
