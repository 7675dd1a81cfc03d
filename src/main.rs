//! Linkup binary entry point

use linkup::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (logging settings live in it)
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    tracing::info!("Starting Linkup...");
    tracing::info!(
        backend = ?config.database.backend,
        cascade_concurrency = config.graph.cascade_concurrency,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    linkup::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(&config).await?;

    // 5. Build Axum router
    let app = linkup::build_router(state);

    // 6. Start HTTP server
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber from `logging.*`
///
/// `RUST_LOG`, when set, takes precedence over `logging.level`.
fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());

    match logging.format {
        config::LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        config::LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}
