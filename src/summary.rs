// Trend summaries from a text-generation model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::fare::{DestinationCount, FareRecord, Mode, RouteStatistics};

pub const NO_INSIGHTS: &str = "No insights available.";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Summary generation is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Model API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync + 'static {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

// Stand-in used when no model credentials are configured
#[derive(Debug, Default, Clone)]
pub struct DisabledGenerator;

#[async_trait]
impl SummaryGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

// Ask the generator for a summary; any failure becomes `NO_INSIGHTS`.
pub async fn summarize(generator: &dyn SummaryGenerator, prompt: &str) -> String {
    match generator.generate(prompt).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Summary generator returned blank text");
            NO_INSIGHTS.to_string()
        }
        Err(e) => {
            warn!("Summary generation failed: {}", e);
            NO_INSIGHTS.to_string()
        }
    }
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("₹{}", v.round()))
        .unwrap_or_else(|| "N/A".to_string())
}

// Everything the route summary prompt is built from
pub struct RouteContext<'a> {
    pub mode: Mode,
    pub origin_code: &'a str,
    pub destination_code: &'a str,
    pub statistics: &'a RouteStatistics,
    pub current: &'a [FareRecord],
    pub top_destinations: &'a [DestinationCount],
}

pub fn build_route_prompt(context: &RouteContext<'_>) -> String {
    let mut lines = vec![
        "You are a travel insights assistant. Provide a concise, actionable summary and bullet points."
            .to_string(),
        format!(
            "Route: {} → {} ({})",
            context.origin_code, context.destination_code, context.mode
        ),
    ];

    let stats = context.statistics;
    if stats.is_empty() {
        lines.push("No historical fare snapshots available.".to_string());
    } else {
        lines.push(format!(
            "Historical fares (last {} snapshots): min {}, max {}, avg {}, volatility {}, cheapest day {}.",
            stats.sample_size,
            money(stats.min_price),
            money(stats.max_price),
            money(stats.mean_price),
            money(stats.std_dev_price),
            stats
                .cheapest_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        ));
    }

    lines.push("Current availability (sample):".to_string());
    if context.current.is_empty() {
        lines.push("No current availability data found.".to_string());
    }
    for record in context.current.iter().take(6) {
        lines.push(format!(
            "- {} {} class {}, availability: {}, price: {}",
            context.mode,
            record.carrier_or_train_identifier.as_deref().unwrap_or("unknown"),
            record.fare_class.as_deref().unwrap_or("N/A"),
            record.availability.as_deref().unwrap_or("N/A"),
            money(record.price),
        ));
    }

    let top = context
        .top_destinations
        .iter()
        .map(|d| format!("{}({})", d.code, d.count))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!(
        "Top destinations right now (by snapshots): {}",
        if top.is_empty() { "N/A" } else { top.as_str() }
    ));

    lines.push(
        "Tasks:\n\
         1) Summarize fare trends in 2-4 sentences and say whether to book now or wait.\n\
         2) Identify the cheapest current options and the price worth waiting for.\n\
         3) Recommend the top 3 actions for the traveller.\n\
         4) Note which destinations are currently popular."
            .to_string(),
    );

    lines.join("\n")
}

// Prompt for mode-wide insights over recent snapshots
pub fn build_insights_prompt(mode: Mode, snapshots: &[FareRecord], sample: usize) -> String {
    let shown = &snapshots[..snapshots.len().min(sample)];
    let data = serde_json::to_string(shown).unwrap_or_default();
    format!(
        "You are an AI travel analyst.\n\
         Analyze the following {} snapshot data from the last 2 months.\n\
         Provide: cheapest routes, average fare trends, popular destinations, \
         cabin/class preferences and the best travel options currently.\n\
         Data ({} of {} snapshots): {}",
        mode,
        shown.len(),
        snapshots.len(),
        data
    )
}

// Data structures for the Gemini generateContent API
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
}

pub struct GeminiGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl SummaryGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Requesting summary from {} ({} prompt chars)", self.model, prompt.len());

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            return Err(GenerationError::ApiResponseError {
                status_code,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;
        first_text(parsed).ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl SummaryGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_placeholder() {
        assert_eq!(summarize(&DisabledGenerator, "prompt").await, NO_INSIGHTS);
        assert_eq!(summarize(&CannedGenerator("   "), "prompt").await, NO_INSIGHTS);
        assert_eq!(summarize(&CannedGenerator("Book now."), "prompt").await, "Book now.");
    }

    #[test]
    fn test_route_prompt_with_history() {
        let statistics = RouteStatistics {
            min_price: Some(300.0),
            max_price: Some(900.0),
            mean_price: Some(500.0),
            std_dev_price: Some(244.95),
            cheapest_date: NaiveDate::from_ymd_opt(2025, 8, 2),
            sample_size: 4,
        };
        let mut current = FareRecord::new(
            Mode::Train,
            "NDLS",
            "BCT",
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            Some(1200.0),
        );
        current.carrier_or_train_identifier = Some("12345".to_string());
        current.fare_class = Some("3A".to_string());
        let top = vec![DestinationCount {
            code: "BCT".to_string(),
            count: 7,
        }];

        let prompt = build_route_prompt(&RouteContext {
            mode: Mode::Train,
            origin_code: "NDLS",
            destination_code: "BCT",
            statistics: &statistics,
            current: std::slice::from_ref(&current),
            top_destinations: &top,
        });

        assert!(prompt.contains("Route: NDLS → BCT (train)"));
        assert!(prompt.contains("min ₹300, max ₹900, avg ₹500, volatility ₹245, cheapest day 2025-08-02"));
        assert!(prompt.contains("- train 12345 class 3A"));
        assert!(prompt.contains("BCT(7)"));
    }

    #[test]
    fn test_route_prompt_without_data() {
        let prompt = build_route_prompt(&RouteContext {
            mode: Mode::Flight,
            origin_code: "DEL",
            destination_code: "BOM",
            statistics: &RouteStatistics::default(),
            current: &[],
            top_destinations: &[],
        });
        assert!(prompt.contains("No historical fare snapshots available."));
        assert!(prompt.contains("No current availability data found."));
        assert!(prompt.contains("(by snapshots): N/A"));
    }

    #[test]
    fn test_first_text_from_response() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "Fares are falling." }], "role": "model" } }
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_text(parsed).as_deref(), Some("Fares are falling."));

        let empty: GenerateResponse = serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert_eq!(first_text(empty), None);
    }
}
