//! Incident review HTTP server binary.
//!
//! Loads configuration, creates the repository, sets up the HTTP router and
//! starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! # Run with the local (in-memory) repository
//! REPOSITORY_TYPE=local cargo run --bin incident-review-server
//!
//! # Run against PostgreSQL
//! DB_USER=reviewer DB_PASSWORD=secret DB_HOST=localhost DB_PORT=5432 DB_NAME=incidents \
//!   cargo run --bin incident-review-server --features postgres-repo
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `RUST_LOG`: Log filter (default: info)
//! - `DASHBOARD_CONFIG`: Path to a TOML configuration file
//! - `REPOSITORY_TYPE`: `local` or `postgres` (default: postgres)
//! - `DATABASE_URL` or `DB_USER`/`DB_PASSWORD`/`DB_HOST`/`DB_PORT`/`DB_NAME`
//!
//! A `.env` file in the working directory is loaded first when present.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use incident_review::db::{RepositoryConfig, RepositoryFactory};
use incident_review::http::{create_router, AppState};
use incident_review::models::Preset;
use incident_review::services::{QuerySettings, SessionStore, DEFAULT_MAX_SESSIONS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }

    info!("Starting incident review server");

    let config = RepositoryConfig::from_default_location()
        .context("Failed to load dashboard configuration")?;

    let (repository, query_settings, default_timeframe, max_sessions) = match &config {
        Some(config) => (
            RepositoryFactory::from_repository_config(config).await?,
            config.query_settings(),
            config.default_timeframe()?,
            config.dashboard.max_sessions,
        ),
        None => (
            RepositoryFactory::from_env().await?,
            QuerySettings::default(),
            Preset::default(),
            DEFAULT_MAX_SESSIONS,
        ),
    };
    info!(
        "Repository initialized ({}), query file {}",
        repository.backend_name(),
        query_settings.query_file.display()
    );

    let state = AppState::new(repository)
        .with_sessions(SessionStore::new().with_capacity(max_sessions))
        .with_query_settings(query_settings)
        .with_default_timeframe(default_timeframe);

    let app = create_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
