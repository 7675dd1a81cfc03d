//! Linkup - account and follow-graph backend for a small social network
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/users registration, login, profile                  │
//! │  - follow / unfollow / delete account                       │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - AccountService: credentials and profile fields           │
//! │  - FollowGraph: mirrored follower/following sets            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - AccountStore trait                                       │
//! │  - SQLite (sqlx) or in-memory (dashmap) backend             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Account store backends
//! - `auth`: Signed tokens and the authenticated-account extractor
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus counters

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Account store (SQLite or in-memory)
    pub store: Arc<dyn data::AccountStore>,

    /// Token issuer, configured from `auth.*`
    pub tokens: Arc<auth::TokenIssuer>,

    /// Registration, login and profile updates
    pub accounts: Arc<service::AccountService>,

    /// Follow / unfollow / delete-account cascade
    pub graph: Arc<service::FollowGraph>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the configured account store
    /// 2. Build the token issuer and services on top of it
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated
    pub async fn new(config: &config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store: Arc<dyn data::AccountStore> = match config.database.backend {
            config::StoreBackend::Sqlite => {
                let db = data::Database::connect(&config.database.path).await?;
                tracing::info!(path = %config.database.path.display(), "Database connected");
                Arc::new(db)
            }
            config::StoreBackend::Memory => {
                tracing::info!("Using in-memory account store");
                Arc::new(data::MemoryStore::new())
            }
        };

        let state = Self::with_store(config, store);
        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    /// Assemble state around an already opened store
    pub fn with_store(config: &config::AppConfig, store: Arc<dyn data::AccountStore>) -> Self {
        let tokens = Arc::new(auth::TokenIssuer::new(&config.auth));
        let accounts = Arc::new(service::AccountService::new(store.clone(), tokens.clone()));
        let graph = Arc::new(service::FollowGraph::new(store.clone(), &config.graph));

        Self {
            store,
            tokens,
            accounts,
            graph,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api/users", api::users_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
