//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, UpstreamStoryAdapter},
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::{io::ErrorKind, sync::Arc, time::Duration};
use storywriter_core::ports::StoryStore;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connects to the document store, or returns `None` so history routes answer 503.
async fn connect_store(config: &Config) -> Option<Arc<dyn StoryStore>> {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not configured. Story history APIs will be disabled.");
        return None;
    };

    info!("Connecting to database...");
    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Database connection failed: {}", e);
            return None;
        }
    };

    let db_adapter = DbAdapter::new(pool);
    info!("Running database migrations...");
    if let Err(e) = db_adapter.run_migrations().await {
        error!("Database migrations failed: {}", e);
        return None;
    }
    info!("Database migrations complete.");
    Some(Arc::new(db_adapter))
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Document Store (optional) ---
    let store = connect_store(&config).await;

    // --- 3. Initialize the Upstream Model Adapter ---
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let model = Arc::new(UpstreamStoryAdapter::new(
        http,
        config.upstream_base_url.clone(),
        config.upstream_api_key.clone(),
        config.upstream_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let store_connected = store.is_some();
    let app_state = Arc::new(AppState {
        store,
        model,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let app = web::router(app_state);

    // --- 6. Start the Server ---
    let listener = match tokio::net::TcpListener::bind(&config.bind_address).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            // Another instance already serves this port.
            warn!(
                "Port {} is already in use. Reusing existing backend process.",
                config.bind_address.port()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!("StoryWriter proxy running on http://{}", config.bind_address);
    info!(
        "API key configured: {}",
        if config.upstream_api_key.is_some() { "Yes" } else { "No" }
    );
    info!("Upstream base URL: {}", config.upstream_base_url);
    info!("Document store connected: {}", if store_connected { "Yes" } else { "No" });
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    axum::serve(listener, app).await?;

    Ok(())
}
