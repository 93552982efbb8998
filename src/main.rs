use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod models;
mod routes;
mod services;

use services::dataset_store::{DatasetStore, MokaDatasetStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::load_config()?;

    // Initialize logging
    logging::init_logging(&config.log_filter)?;

    let addr = SocketAddr::new(config.host, config.port);

    // Build our application state
    let state = Arc::new(AppState::new(config));

    // Build our application with a route
    let app = routes::app(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    store: Arc<dyn DatasetStore>,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let store = Arc::new(MokaDatasetStore::new(config.max_datasets, config.dataset_idle));
        Self::with_store(config, store)
    }

    fn with_store(config: config::Config, store: Arc<dyn DatasetStore>) -> Self {
        Self { config, store }
    }
}
