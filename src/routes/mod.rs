use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    services::dataset_store::Dataset,
    AppState,
};

pub mod analysis;
pub mod data;

/// Allowance for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let api = Router::new()
        .merge(data::routes())
        .merge(analysis::routes());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(
            state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

pub(crate) fn find_dataset(state: &AppState, dataset_id: &str) -> Result<Arc<Dataset>, AppError> {
    state.store.get(dataset_id).ok_or_else(|| {
        tracing::warn!("Dataset {} not found", dataset_id);
        AppError::NotFound(format!("Dataset '{}' not found", dataset_id))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use bytes::Bytes;
    use chrono::Utc;

    use crate::config::Config;
    use crate::services::dataset_store::{Dataset, DatasetMetadata};
    use crate::services::file_processor::parse_upload;
    use crate::AppState;

    pub fn state() -> Arc<AppState> {
        state_with(Config::default())
    }

    pub fn state_with(config: Config) -> Arc<AppState> {
        Arc::new(AppState::new(config))
    }

    /// Parses `csv` and stores it under `id`.
    pub fn seed_csv(state: &AppState, id: &str, csv: &'static str) {
        let table = parse_upload("seed.csv", Bytes::from(csv)).unwrap();
        state.store.put(
            id.to_string(),
            Arc::new(Dataset {
                table,
                metadata: DatasetMetadata {
                    filename: "seed.csv".to_string(),
                    size: csv.len(),
                    content_type: "text/csv".to_string(),
                    created_at: Utc::now(),
                },
            }),
        );
    }
}
