use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppError,
    services::analysis::{self, ColumnAnalysis, ColumnListing, ColumnMap, DatasetQualityMetrics, NumericSummary, QualityReport},
    AppState,
};

use super::find_dataset;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analysis/columns/:dataset_id", get(get_columns))
        .route("/analysis/describe/:dataset_id", get(describe_dataset))
        .route("/analysis/dataset/:dataset_id", get(analyze_dataset))
        .route("/analysis/quality/:dataset_id", get(analyze_data_quality))
        .route("/analysis/analyze/:dataset_id/:column_name", post(analyze_column))
}

#[derive(Debug, Deserialize)]
pub struct DescribeQuery {
    columns: Option<String>,
}

impl DescribeQuery {
    fn selected(&self) -> Vec<&str> {
        self.columns
            .as_deref()
            .map(|raw| raw.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    success: bool,
    message: String,
    data: ColumnListing,
}

#[derive(Debug, Serialize)]
pub struct DescribeResponse {
    description: ColumnMap<NumericSummary>,
    #[serde(rename = "qualityMetrics")]
    quality_metrics: DatasetQualityMetrics,
}

#[derive(Debug, Serialize)]
pub struct DatasetDescription {
    description: ColumnMap<NumericSummary>,
    total_rows: usize,
    total_columns: usize,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    success: bool,
    message: String,
    data: DatasetDescription,
}

#[derive(Debug, Serialize)]
pub struct QualityResponse {
    success: bool,
    quality_analysis: QualityReport,
}

/// Runs an analysis off the async workers; a panic inside it surfaces as
/// a generic computation failure.
async fn compute<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    let start = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(f).await??;
    tracing::debug!("Analysis finished in {:?}", start.elapsed());
    Ok(result)
}

async fn get_columns(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<ColumnsResponse>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    tracing::info!("Listing columns for {}", dataset_id);

    let listing = compute(move || {
        analysis::validate_table(&dataset.table)?;
        Ok(analysis::list_columns(&dataset.table))
    })
    .await?;

    Ok(Json(ColumnsResponse {
        success: true,
        message: "Columns retrieved successfully".to_string(),
        data: listing,
    }))
}

async fn describe_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Query(query): Query<DescribeQuery>,
) -> Result<Json<DescribeResponse>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    let selected: Vec<String> = query.selected().into_iter().map(str::to_owned).collect();
    tracing::info!("Describing {} (columns: {:?})", dataset_id, selected);

    let response = compute(move || {
        let table = &dataset.table;
        analysis::validate_table(table)?;

        let columns: Vec<&str> = if selected.is_empty() {
            table.columns()
        } else {
            selected
                .iter()
                .map(String::as_str)
                .filter(|c| {
                    let known = table.has_column(c);
                    if !known {
                        tracing::warn!("Skipping unknown column {}", c);
                    }
                    known
                })
                .collect()
        };

        Ok(DescribeResponse {
            description: analysis::describe_columns(table, &columns),
            quality_metrics: analysis::dataset_quality_metrics(table, &columns),
        })
    })
    .await?;

    Ok(Json(response))
}

async fn analyze_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<DatasetResponse>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    tracing::info!("Analyzing dataset {}", dataset_id);

    let data = compute(move || {
        let table = &dataset.table;
        analysis::validate_table(table)?;
        let columns = table.columns();
        Ok(DatasetDescription {
            description: analysis::describe_columns(table, &columns),
            total_rows: table.row_count(),
            total_columns: columns.len(),
        })
    })
    .await?;

    Ok(Json(DatasetResponse {
        success: true,
        message: "Dataset analysis completed successfully".to_string(),
        data,
    }))
}

async fn analyze_data_quality(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<QualityResponse>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    tracing::info!("Analyzing data quality for {}", dataset_id);

    let quality_analysis = compute(move || {
        analysis::validate_table(&dataset.table)?;
        Ok(analysis::analyze_quality(&dataset.table))
    })
    .await?;

    Ok(Json(QualityResponse {
        success: true,
        quality_analysis,
    }))
}

async fn analyze_column(
    State(state): State<Arc<AppState>>,
    Path((dataset_id, column_name)): Path<(String, String)>,
) -> Result<Json<ColumnAnalysis>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    tracing::info!("Analyzing column {} of {}", column_name, dataset_id);

    let result = compute(move || {
        analysis::validate_table(&dataset.table)?;
        analysis::analyze_column(&dataset.table, &column_name)
    })
    .await?;

    Ok(Json(result))
}
