use serde::Serialize;

use crate::pipeline::BatchSummary;
use crate::types::InputRow;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub total_rows: usize,
    pub preview: Vec<InputRow>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub manifest_rows: usize,
    pub execution_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub browser_path: String,
    pub bucket: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
