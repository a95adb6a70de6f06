//! Subtitle relay server
//!
//! Serves the messaging boundary the caption overlay talks to:
//! translation and transcription as stateless HTTP requests, backed by
//! the cache-first provider pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subrelay::config::ServerConfig;
use subrelay::error::{RelayError, Result};
use subrelay::http::create_router;
use subrelay::kv::{JsonFileKv, KvStore, MemoryKv};
use subrelay::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "subrelay";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    tracing::info!("{} v{} starting", APP_NAME, VERSION);

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        match ServerConfig::from_file(&config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Failed to load config file {}: {}. Using defaults.",
                    config_path,
                    e
                );
                ServerConfig::default()
            }
        }
    } else {
        ServerConfig::default()
    };
    tracing::info!("Configuration loaded: {:?}", config);

    // Open the key-value store shared by settings and the cache
    let kv: Arc<dyn KvStore> = match &config.store_path {
        Some(path) => {
            tracing::info!("Using persisted store at {}", path);
            Arc::new(JsonFileKv::open(path)?)
        }
        None => MemoryKv::shared(),
    };

    // Create application state and router
    let state = Arc::new(AppState::new(config.clone(), kv));
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayError::Config(format!("server error: {}", e)))?;

    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subrelay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
