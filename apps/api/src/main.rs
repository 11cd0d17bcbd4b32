mod config;
mod errors;
mod llm_client;
mod lookup;
mod output_log;
mod projection;
mod routes;
mod session;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{client_from_config, ModelCatalog};
use crate::lookup::LookupTables;
use crate::output_log::OutputLog;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing credential)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Projection API v{}", env!("CARGO_PKG_VERSION"));

    // Lookup tables are read once and shared read-only
    let lookup = LookupTables::load(&config.education_table_path, &config.wage_table_path)
        .context("Failed to load lookup tables")?;

    // Initialize completion backend
    let completion = client_from_config(&config)?;
    let models = ModelCatalog::for_provider(config.provider, config.default_model.clone());
    info!(
        "Completion client initialized ({:?}, default model: {})",
        config.provider, models.default_model
    );

    let state = AppState {
        lookup: Arc::new(lookup),
        completion,
        sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
        output_log: OutputLog::new(&config.output_log_path),
        models,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
