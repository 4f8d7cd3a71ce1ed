//! Fare tracker service entry point.
//!
//! Fetches current fares from the configured providers, records them as daily
//! snapshots and serves route statistics and trend summaries over HTTP.

use anyhow::Result;
use fare_tracker::{
    create_router, AppConfig, DisabledGenerator, FareService, GeminiGenerator, InMemoryTableStore,
    PersistentStore, RestTableStore, SnapshotStore, SummaryGenerator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Generation is slower than provider lookups
const GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

fn table_backend(config: &AppConfig) -> Result<Arc<dyn PersistentStore>> {
    match &config.table_api {
        Some(api) => {
            info!("Storing snapshots via table API at {}", api.url);
            let store = RestTableStore::new(
                api.url.clone(),
                api.service_key.clone(),
                config.adapter_policy().timeout,
            )?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("SUPABASE_URL not set, snapshots are kept in memory only");
            Ok(Arc::new(InMemoryTableStore::new()))
        }
    }
}

fn summary_generator(config: &AppConfig) -> Result<Arc<dyn SummaryGenerator>> {
    match &config.gemini_api_key {
        Some(key) => {
            info!("Summaries generated with {}", config.gemini_model);
            let generator =
                GeminiGenerator::new(key.clone(), config.gemini_model.clone(), GENERATOR_TIMEOUT)?;
            Ok(Arc::new(generator))
        }
        None => {
            warn!("GEMINI_API_KEY not set, summaries are disabled");
            Ok(Arc::new(DisabledGenerator))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fare tracker...");

    let config = AppConfig::from_env()?;

    let store = SnapshotStore::new(table_backend(&config)?, config.table.clone());
    let service = FareService::new(
        config.provider_set(),
        store,
        summary_generator(&config)?,
        config.settings.clone(),
    );

    let app = create_router(Arc::new(service));
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
