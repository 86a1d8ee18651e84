//! Core data types for locality-thumbnails

use serde::{Deserialize, Serialize};

/// Polygon cell value meaning "no geometry, skip this row"
pub const SKIP_SENTINEL: &str = "0";

/// One record of the uploaded spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    /// City name
    #[serde(rename = "CityName")]
    pub city: String,
    /// Sublocation name, also used as the map label
    #[serde(rename = "SubLocationName")]
    pub sublocation: String,
    /// Encoded polyline, or the skip sentinel
    #[serde(rename = "Polygon")]
    pub polygon: String,
}

impl InputRow {
    /// Creates a new input row
    pub fn new(city: impl Into<String>, sublocation: impl Into<String>, polygon: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            sublocation: sublocation.into(),
            polygon: polygon.into(),
        }
    }

    /// Returns true if the row carries no geometry
    pub fn is_skip(&self) -> bool {
        self.polygon == SKIP_SENTINEL
    }
}

/// Outcome of one processed row, as reported to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub sublocation: String,
    pub city: String,
    #[serde(flatten)]
    pub status: RecordStatus,
}

/// Success carries the uploaded image, error carries the failure message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordStatus {
    Success { file_name: String, url: String },
    Error { error: String },
}

impl ResultRecord {
    /// Creates a success record for a row
    pub fn success(row: &InputRow, file_name: String, url: String) -> Self {
        Self {
            sublocation: row.sublocation.clone(),
            city: row.city.clone(),
            status: RecordStatus::Success { file_name, url },
        }
    }

    /// Creates an error record for a row
    pub fn error(row: &InputRow, error: impl Into<String>) -> Self {
        Self {
            sublocation: row.sublocation.clone(),
            city: row.city.clone(),
            status: RecordStatus::Error { error: error.into() },
        }
    }

    /// Returns true if the row reached DONE successfully
    pub fn is_success(&self) -> bool {
        matches!(self.status, RecordStatus::Success { .. })
    }

    /// Returns the manifest row for a success record
    pub fn manifest_entry(&self) -> Option<ManifestEntry> {
        match &self.status {
            RecordStatus::Success { file_name, url } => Some(ManifestEntry {
                sublocation: self.sublocation.clone(),
                city: self.city.clone(),
                file_name: file_name.clone(),
                url: url.clone(),
            }),
            RecordStatus::Error { .. } => None,
        }
    }
}

/// One row of the output manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "SubLocation")]
    pub sublocation: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Image File Name")]
    pub file_name: String,
    #[serde(rename = "Image URL")]
    pub url: String,
}

/// Progress indicator for a running batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Rows finished so far
    pub processed: usize,
    /// Rows in the batch
    pub total: usize,
    /// Label of the row being processed, if any
    pub current: Option<String>,
}

impl Progress {
    /// Fraction of the batch finished, in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}
