// Fare tracker: provider fan-out, snapshot history and route statistics

pub mod adapters;
pub mod api;
pub mod config;
pub mod fare;
pub mod normalizer;
pub mod provider;
pub mod service;
pub mod statistics;
pub mod store;
pub mod summary;

// Re-export key types for convenience
pub use adapters::{FetchRequest, FixtureAdapter, ProviderAdapter, ProviderSet};
pub use api::create_router;
pub use config::{AppConfig, ConfigError, ServiceSettings};
pub use fare::{FareRecord, Mode, RouteStatistics};
pub use normalizer::{normalize, NormalizeError, SnapshotContext};
pub use provider::{FlightOffer, ProviderRecord, TrainClass, TrainService};
pub use service::{FareError, FareQuery, FareService, ValidationError};
pub use statistics::{compute_statistics, top_destinations};
pub use store::{InMemoryTableStore, PersistentStore, RestTableStore, SnapshotStore, StorageError};
pub use summary::{DisabledGenerator, GeminiGenerator, GenerationError, SummaryGenerator};
