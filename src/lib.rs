pub mod config;
pub mod controllers;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::events::EventBus;
use crate::store::{MemoryRepository, PgRepository, ShowtimeRepository};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ShowtimeRepository>,
    pub events: EventBus,
    pub config: config::Config,
}

impl AppState {
    /// Wires the repository from configuration: Postgres when DATABASE_URL is
    /// set, the in-process store otherwise.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let repo: Arc<dyn ShowtimeRepository> = match &config.database.url {
            Some(url) => {
                let pg = PgRepository::connect(url, config.database.pool_size, &config.booking).await?;
                pg.run_migrations().await?;
                Arc::new(pg)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-process showtime store");
                Arc::new(MemoryRepository::from_config(&config.booking))
            }
        };

        Ok(Arc::new(Self {
            repo,
            events: EventBus::default(),
            config,
        }))
    }

    /// In-process state for tests and local tooling.
    pub fn in_memory(config: config::Config) -> Arc<Self> {
        Arc::new(Self {
            repo: Arc::new(MemoryRepository::from_config(&config.booking)),
            events: EventBus::default(),
            config,
        })
    }
}

/// Builds the application router with all API routes mounted under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Showtime API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
