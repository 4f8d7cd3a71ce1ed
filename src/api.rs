//! HTTP API for the fare tracker.
//!
//! Endpoints:
//! - `GET|POST /api/fares` - Fetch current fares for a route, store them and return statistics
//! - `GET /api/trends` - Stored price points for a route
//! - `GET /api/summary` - Route statistics, current availability and a generated analysis
//! - `GET /api/insights` - Generated analysis over recent snapshots of one mode
//! - `GET /health` - Health check
//!
//! Every error body is `{ "error": message }`.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::service::{FareError, FareQuery, FareService};

// Create the HTTP router.
pub fn create_router(service: Arc<FareService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/fares", get(fares_query_handler).post(fares_body_handler))
        .route("/api/trends", get(trends_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/insights", get(insights_handler))
        .with_state(service)
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    providers: Vec<String>,
}

// API error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

impl IntoResponse for FareError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        error_response(status, self.to_string())
    }
}

async fn health_handler(State(service): State<Arc<FareService>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        providers: service.provider_names(),
    })
}

async fn fares_query_handler(
    State(service): State<Arc<FareService>>,
    Query(query): Query<FareQuery>,
) -> Result<impl IntoResponse, FareError> {
    Ok(Json(service.snapshot(&query).await?))
}

async fn fares_body_handler(
    State(service): State<Arc<FareService>>,
    body: Result<Json<FareQuery>, JsonRejection>,
) -> Response {
    let Json(query) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match service.snapshot(&query).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn trends_handler(
    State(service): State<Arc<FareService>>,
    Query(query): Query<FareQuery>,
) -> Result<impl IntoResponse, FareError> {
    Ok(Json(service.trends(&query).await?))
}

async fn summary_handler(
    State(service): State<Arc<FareService>>,
    Query(query): Query<FareQuery>,
) -> Result<impl IntoResponse, FareError> {
    Ok(Json(service.summary(&query).await?))
}

#[derive(Debug, Deserialize)]
struct InsightsParams {
    #[serde(default, alias = "type")]
    mode: Option<String>,
}

async fn insights_handler(
    State(service): State<Arc<FareService>>,
    Query(params): Query<InsightsParams>,
) -> Result<impl IntoResponse, FareError> {
    Ok(Json(service.insights(params.mode.as_deref()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixtureAdapter, ProviderSet};
    use crate::config::ServiceSettings;
    use crate::service::tests::{harness, FailingStore, RecordingGenerator};
    use crate::store::{SnapshotStore, DEFAULT_TABLE};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn router() -> Router {
        create_router(Arc::new(harness().service))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["providers"][0], "demo");
    }

    #[tokio::test]
    async fn test_fares_via_query_string() {
        let (status, body) = call(
            router(),
            get("/api/fares?type=flight&from=DEL&to=BOM&date=2025-09-20"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"]["mode"], "flight");
        assert_eq!(body["query"]["date"], "2025-09-20");
        assert_eq!(body["stored"], 2);
        assert_eq!(body["records"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["statistics"]["min_price"], 4500.0);
    }

    #[tokio::test]
    async fn test_fares_via_json_body() {
        let (status, body) = call(
            router(),
            post_json(
                "/api/fares",
                r#"{"mode":"train","origin":"NDLS","destination":"BCT","date":"2025-09-20"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"][1]["fare_class"], "3A");
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let (status, body) = call(router(), get("/api/fares?mode=flight&origin=DEL&date=2025-09-20")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: destination");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = call(router(), post_json("/api/fares", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal_error() {
        let service = FareService::new(
            ProviderSet::new().with(Arc::new(FixtureAdapter::demo())),
            SnapshotStore::new(Arc::new(FailingStore), DEFAULT_TABLE),
            Arc::new(RecordingGenerator::default()),
            ServiceSettings::default(),
        );

        let (status, body) = call(
            create_router(Arc::new(service)),
            get("/api/trends?mode=flight&origin=DEL&destination=BOM"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Storage failure"));
    }

    #[tokio::test]
    async fn test_trends_after_snapshot() {
        let router = router();
        let (status, _) = call(
            router.clone(),
            get("/api/fares?mode=flight&origin=DEL&destination=BOM&date=2025-09-20"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(router, get("/api/trends?mode=flight&origin=DEL&destination=BOM")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"], "DEL");
        assert_eq!(body["fares"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["fares"][0]["snapshot_date"], "2025-09-15");
    }

    #[tokio::test]
    async fn test_insights_without_data() {
        let (status, body) = call(router(), get("/api/insights?type=flight")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["insights"], "No data available for insights yet.");
    }

    #[tokio::test]
    async fn test_summary_requires_route() {
        let (status, _) = call(router(), get("/api/summary?mode=flight&origin=DEL")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
