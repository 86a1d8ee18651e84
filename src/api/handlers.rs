use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use crate::input::read_rows;
use crate::manifest::{Manifest, ManifestWriter, DOWNLOAD_FILE_NAME};
use crate::pipeline::{run_batch, BatchSummary, RowProcessor};
use crate::render::Rasterizer;
use crate::types::{InputRow, Progress};
use crate::Error;
use super::models::*;

const PREVIEW_ROWS: usize = 5;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared state for one operator session
pub struct AppState<R> {
    processor: RowProcessor<R>,
    browser: String,
    running: Arc<AtomicBool>,
    progress: watch::Sender<Progress>,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    rows: Option<Vec<InputRow>>,
    manifest: Option<Manifest>,
}

impl<R> AppState<R> {
    pub fn new(processor: RowProcessor<R>, browser: impl Into<String>) -> Self {
        Self {
            processor,
            browser: browser.into(),
            running: Arc::new(AtomicBool::new(false)),
            progress: watch::Sender::new(Progress::default()),
            session: Mutex::new(Session::default()),
        }
    }
}

/// Clears the running flag when the batch task finishes
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(Arc::clone(flag)))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

pub async fn health<R: Rasterizer + Send + Sync + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        browser_path: state.browser.clone(),
        bucket: state.processor.store().bucket().to_string(),
    })
}

pub async fn upload_csv<R: Rasterizer + Send + Sync + 'static>(
    State(state): State<Arc<AppState<R>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut csv_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some("csv") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e)))?;
            csv_data = Some(bytes.to_vec());
        }
    }

    let csv_data = csv_data.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing CSV file"))?;

    let rows = read_rows(csv_data.as_slice()).map_err(|e| match e {
        Error::MissingColumns(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        other => api_error(StatusCode::BAD_REQUEST, format!("Error reading CSV: {}", other)),
    })?;

    info!(rows = rows.len(), "CSV uploaded");
    let response = UploadResponse {
        total_rows: rows.len(),
        preview: rows.iter().take(PREVIEW_ROWS).cloned().collect(),
    };

    state.session.lock().await.rows = Some(rows);
    Ok(Json(response))
}

/// Starts the batch on its own task so that it runs to completion, and
/// leaves its manifest for download, even if this request is dropped
pub async fn generate_maps<R: Rasterizer + Send + Sync + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let start = Instant::now();

    let guard = RunGuard::acquire(&state.running)
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "A batch is already running"))?;

    let rows = {
        let mut session = state.session.lock().await;
        let rows = session
            .rows
            .clone()
            .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Upload a CSV file first"))?;
        session.manifest = None;
        rows
    };

    let task_state = Arc::clone(&state);
    let batch = tokio::spawn(async move {
        let _guard = guard;
        let (summary, manifest) = run_to_manifest(&task_state, &rows).await?;
        let manifest_rows = manifest.rows();
        task_state.session.lock().await.manifest = Some(manifest);
        info!(manifest_rows, "manifest ready for download");
        Ok::<_, Error>((summary, manifest_rows))
    });

    let (summary, manifest_rows) = batch
        .await
        .map_err(|e| {
            error!(error = %e, "batch task aborted");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Processing error: {}", e))
        })?
        .map_err(|e| {
            error!(error = %e, "batch failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Processing error: {}", e))
        })?;

    Ok(Json(GenerateResponse {
        summary,
        manifest_rows,
        execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

async fn run_to_manifest<R: Rasterizer + Sync>(
    state: &AppState<R>,
    rows: &[InputRow],
) -> crate::Result<(BatchSummary, Manifest)> {
    let mut writer = ManifestWriter::create_in(state.processor.scratch_dir())?;
    let summary = run_batch(&state.processor, rows, &mut writer, |progress| {
        state.progress.send_replace(progress);
    })
    .await;
    Ok((summary, writer.finish()?))
}

pub async fn get_progress<R: Rasterizer + Send + Sync + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Json<Progress> {
    Json(state.progress.borrow().clone())
}

pub async fn download_manifest<R: Rasterizer + Send + Sync + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<Response, ApiError> {
    let manifest = state
        .session
        .lock()
        .await
        .manifest
        .take()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No output CSV is waiting for download"))?;

    let bytes = manifest.take_bytes().map_err(|e| {
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to read output CSV: {}", e))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        bytes,
    )
        .into_response())
}
