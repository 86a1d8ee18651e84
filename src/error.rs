//! Error types for locality-thumbnails

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::render::WaitCondition;

/// Result type for thumbnail pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while producing thumbnails
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed spreadsheet or manifest CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input spreadsheet lacks required columns
    #[error("CSV must contain columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Encoded polyline could not be decoded
    #[error("Invalid polyline: {0}")]
    Polyline(String),

    /// Decoded polygon has no coordinates
    #[error("Polygon has no coordinates")]
    EmptyGeometry,

    /// Browser failed to produce a screenshot
    #[error("Render failed: {0}")]
    Render(String),

    /// Browser did not finish within the wait budget
    #[error("Render timed out after {timeout:?} waiting for {condition}")]
    RenderTimeout {
        condition: WaitCondition,
        timeout: Duration,
    },

    /// Object store rejected an operation
    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Formatting into an in-memory buffer failed
    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Missing or unusable startup configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors that must stop the session before any row runs
    pub fn is_setup(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
