//! Prediction server
//!
//! Serves the cached heart disease model over HTTP:
//! - `GET /predict?bmi=..&score=..&smoke=..&stroke=..&sex=..&age=..&diabetic=..&kidney=..`
//! - `GET /health`

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::config::{env_lookup, optional_or, parse_value};
use crate::inference::{ModelCache, ModelLocation};
use crate::storage::ObjectStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
    /// Where the model artifact is fetched from
    pub model: ModelLocation,
}

impl ServerConfig {
    /// Read `API_HOST`, `API_PORT`, `CORS_ORIGIN`, `MODEL_BUCKET` and `MODEL_KEY`
    pub fn from_env() -> crate::error::Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: optional_or(&lookup, "API_HOST", "0.0.0.0"),
            port: parse_value("API_PORT", &optional_or(&lookup, "API_PORT", "8080"))?,
            cors_origin: lookup("CORS_ORIGIN"),
            model: ModelLocation::from_lookup(&lookup)?,
        })
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig, store: Arc<dyn ObjectStore>) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let cache = Arc::new(ModelCache::new(store, config.model.clone()));
    let state = Arc::new(AppState::new(config.clone(), cache.clone()));
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        model = %config.model,
        started_at = %start_time.to_rfc3339(),
        "Prediction server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            model_loaded = cache.is_loaded(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
