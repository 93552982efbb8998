use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::Row,
    services::{
        analysis,
        dataset_store::{Dataset, DatasetMetadata},
        file_processor,
    },
    AppState,
};

use super::find_dataset;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data/upload", post(upload_dataset))
        .route("/data/datasets", get(list_datasets))
        .route("/data/head/:dataset_id", get(dataset_head))
        .route("/data/:dataset_id", delete(delete_dataset))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    success: bool,
    dataset_id: String,
    metadata: DatasetMetadata,
    rows: usize,
    columns: usize,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    id: String,
    metadata: DatasetSummaryMetadata,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummaryMetadata {
    created_at: DateTime<Utc>,
    filename: String,
    rows: usize,
}

#[derive(Debug, Serialize)]
pub struct DatasetList {
    datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Deserialize)]
pub struct HeadQuery {
    rows: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HeadData {
    columns: Vec<String>,
    rows: Vec<Row>,
    total_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct HeadResponse {
    success: bool,
    message: String,
    data: HeadData,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    success: bool,
    message: String,
}

async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::InvalidInput("Uploaded file has no name".to_string()))?;
        let content_type = field.content_type().map(str::to_owned).unwrap_or_default();
        let file_data = field.bytes().await?;
        upload = Some((filename, content_type, file_data));
        break;
    }

    let (filename, content_type, file_data) =
        upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let size = file_data.len();
    tracing::info!("Received upload {} ({}KB)", filename, size / 1024);
    if size > state.config.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            state.config.max_file_size
        )));
    }

    let table = {
        let filename = filename.clone();
        tokio::task::spawn_blocking(move || file_processor::parse_upload(&filename, file_data)).await??
    };

    let rows = table.row_count();
    let columns = table.columns().len();
    let metadata = DatasetMetadata {
        filename,
        size,
        content_type,
        created_at: Utc::now(),
    };

    let dataset_id = state.store.insert_new(Arc::new(Dataset {
        table,
        metadata: metadata.clone(),
    }));
    tracing::info!("Stored {} as {} in {:?}", metadata.filename, dataset_id, start.elapsed());

    Ok(Json(UploadResponse {
        success: true,
        dataset_id,
        metadata,
        rows,
        columns,
    }))
}

async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<DatasetList> {
    let datasets = state
        .store
        .list()
        .into_iter()
        .map(|entry| DatasetSummary {
            metadata: DatasetSummaryMetadata {
                created_at: entry.dataset.metadata.created_at,
                filename: entry.dataset.metadata.filename.clone(),
                rows: entry.dataset.table.row_count(),
            },
            id: entry.id,
        })
        .collect();

    Json(DatasetList { datasets })
}

async fn dataset_head(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
    Query(query): Query<HeadQuery>,
) -> Result<Json<HeadResponse>, AppError> {
    let dataset = find_dataset(&state, &dataset_id)?;
    let table = &dataset.table;
    analysis::validate_table(table)?;

    let num_rows = query.rows.unwrap_or(state.config.head_rows);
    Ok(Json(HeadResponse {
        success: true,
        message: "Dataset head retrieved successfully".to_string(),
        data: HeadData {
            columns: table.columns().into_iter().map(str::to_owned).collect(),
            rows: table.head(num_rows).to_vec(),
            total_rows: table.row_count(),
        },
    }))
}

async fn delete_dataset(
    State(state): State<Arc<AppState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.store.remove(&dataset_id) {
        return Err(AppError::NotFound(format!("Dataset '{}' not found", dataset_id)));
    }
    tracing::info!("Deleted dataset {}", dataset_id);

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Dataset '{}' deleted successfully", dataset_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    use crate::config::Config;
    use crate::routes::test_support::{seed_csv, state, state_with};

    const BOUNDARY: &str = "table-insights-boundary";

    /// One `(field name, optional filename, content)` per part.
    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let disposition = match filename {
                Some(filename) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n",
                    name, filename
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/data/upload")
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn upload_stores_csv_and_reports_shape() {
        let state = state();
        let form = multipart(&[
            ("note", None, &b"ignored"[..]),
            ("file", Some("people.csv"), &b"name,age\nana,31\nbo,27\n"[..]),
        ])
        .await;

        let Json(response) = upload_dataset(State(state.clone()), form).await.unwrap();
        assert!(response.success);
        assert!(response.dataset_id.starts_with("dataset_"));
        assert_eq!(response.rows, 2);
        assert_eq!(response.columns, 2);
        assert_eq!(response.metadata.filename, "people.csv");
        assert_eq!(response.metadata.content_type, "text/csv");

        let stored = state.store.get(&response.dataset_id).unwrap();
        assert_eq!(stored.table.columns(), vec!["name", "age"]);
    }

    #[tokio::test]
    async fn upload_without_file_field() {
        let form = multipart(&[("other", Some("people.csv"), &b"a\n1\n"[..])]).await;
        let err = upload_dataset(State(state()), form).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref msg) if msg == "No file provided"));
    }

    #[tokio::test]
    async fn upload_without_filename() {
        let form = multipart(&[("file", None, &b"a\n1\n"[..])]).await;
        let err = upload_dataset(State(state()), form).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref msg) if msg == "Uploaded file has no name"));
    }

    #[tokio::test]
    async fn upload_at_the_size_limit_is_accepted() {
        let csv: &[u8] = b"a\n1\n2\n";
        let state = state_with(Config {
            max_file_size: csv.len(),
            ..Config::default()
        });

        let form = multipart(&[("file", Some("t.csv"), csv)]).await;
        assert!(upload_dataset(State(state.clone()), form).await.is_ok());

        let bigger: &[u8] = b"a\n1\n2\n3\n";
        let form = multipart(&[("file", Some("t.csv"), bigger)]).await;
        let err = upload_dataset(State(state), form).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn body_over_the_request_limit_is_payload_too_large() {
        // no DefaultBodyLimit layer here, so axum's 2 MiB default applies
        let content = vec![b'x'; 3 * 1024 * 1024];
        let form = multipart(&[("file", Some("big.csv"), content.as_slice())]).await;
        let err = upload_dataset(State(state()), form).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn head_returns_first_rows() {
        let state = state();
        seed_csv(&state, "d1", "a,b\n1,x\n2,y\n3,z\n");

        let Json(response) = dataset_head(
            State(state.clone()),
            Path("d1".to_string()),
            Query(HeadQuery { rows: Some(2) }),
        )
        .await
        .unwrap();

        assert_eq!(response.data.columns, vec!["a", "b"]);
        assert_eq!(response.data.rows.len(), 2);
        assert_eq!(response.data.total_rows, 3);
    }

    #[tokio::test]
    async fn head_defaults_to_configured_rows() {
        let state = state();
        seed_csv(&state, "d1", "a\n1\n2\n3\n4\n5\n6\n7\n");

        let Json(response) = dataset_head(State(state), Path("d1".to_string()), Query(HeadQuery { rows: None }))
            .await
            .unwrap();
        assert_eq!(response.data.rows.len(), 5);
    }

    #[tokio::test]
    async fn head_of_unknown_dataset() {
        let err = dataset_head(State(state()), Path("missing".to_string()), Query(HeadQuery { rows: None }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_then_delete() {
        let state = state();
        seed_csv(&state, "d1", "a\n1\n");

        let Json(list) = list_datasets(State(state.clone())).await;
        assert_eq!(list.datasets.len(), 1);
        assert_eq!(list.datasets[0].id, "d1");
        assert_eq!(list.datasets[0].metadata.rows, 1);

        delete_dataset(State(state.clone()), Path("d1".to_string())).await.unwrap();
        let err = delete_dataset(State(state.clone()), Path("d1".to_string())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(state.store.get("d1").is_none());
    }
}
