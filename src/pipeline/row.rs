//! Row processor
//!
//! START -> DECODE -> BBOX -> RENDER_DOC -> RASTERIZE -> UPLOAD -> DONE.
//! The skip sentinel goes straight to DONE with no record. Any stage
//! failure ends the row with a single error record.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::codec::polyline::{self, DEFAULT_PRECISION};
use crate::document::{MapDocument, MapLayout};
use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::render::{self, Rasterizer, RenderSettings};
use crate::storage::{thumbnail_file_name, ThumbnailStore};
use crate::types::{InputRow, ResultRecord};

/// Terminal state of one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Polygon was the skip sentinel
    Skipped,
    /// Row reached DONE or ERROR
    Completed(ResultRecord),
}

/// Everything a row needs, built once at startup and shared by reference
pub struct RowProcessor<R> {
    rasterizer: R,
    store: ThumbnailStore,
    render: RenderSettings,
    layout: MapLayout,
    scratch_dir: PathBuf,
}

impl<R: Rasterizer + Sync> RowProcessor<R> {
    /// Creates a processor writing scratch files to the system temp dir
    pub fn new(rasterizer: R, store: ThumbnailStore, render: RenderSettings) -> Self {
        Self {
            rasterizer,
            store,
            render,
            layout: MapLayout::default(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Uses `dir` for per-row scratch files
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Directory for per-row scratch files
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Storage the processor uploads to
    pub fn store(&self) -> &ThumbnailStore {
        &self.store
    }

    /// Browser the processor renders with
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Processes one row; never fails, errors become error records
    pub async fn process(&self, row: &InputRow) -> RowOutcome {
        if row.is_skip() {
            info!(sublocation = %row.sublocation, city = %row.city, "no polygon, skipping row");
            return RowOutcome::Skipped;
        }

        match self.generate(row).await {
            Ok((file_name, url)) => {
                info!(sublocation = %row.sublocation, city = %row.city, %url, "thumbnail published");
                RowOutcome::Completed(ResultRecord::success(row, file_name, url))
            }
            Err(e) => {
                warn!(sublocation = %row.sublocation, city = %row.city, error = %e, "row failed");
                RowOutcome::Completed(ResultRecord::error(row, e.to_string()))
            }
        }
    }

    async fn generate(&self, row: &InputRow) -> Result<(String, String)> {
        let coordinates = polyline::decode(&row.polygon, DEFAULT_PRECISION)?;
        let bbox = BoundingBox::from_coordinates(&coordinates)?;
        let document = MapDocument::build(&coordinates, &bbox, &row.sublocation, &self.layout)?;

        let document_file = document.write_temp(&self.scratch_dir)?;
        let captured = render::rasterize(&self.rasterizer, document_file.path(), &self.render).await;
        discard(document_file);
        let png = captured?;

        let file_name = thumbnail_file_name(&row.sublocation, &row.city);
        let url = self.store.upload(&file_name, png).await?;
        Ok((file_name, url))
    }
}

fn discard(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!(path = %path.display(), error = %e, "failed to remove map document");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::local::LocalFileSystem;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use object_store::ObjectStore;

    use super::*;
    use crate::codec::polyline::encode;
    use crate::geometry::Coordinate;
    use crate::render::fake::ScriptedRasterizer;
    use crate::types::RecordStatus;

    const VALID: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn build_processor(
        rasterizer: ScriptedRasterizer,
        scratch: &Path,
    ) -> (Arc<InMemory>, RowProcessor<ScriptedRasterizer>) {
        let memory = Arc::new(InMemory::new());
        let store = ThumbnailStore::new(memory.clone(), "static-site-data", "https://static.squareyards.com");
        let processor = RowProcessor::new(rasterizer, store, RenderSettings::default())
            .with_scratch_dir(scratch);
        (memory, processor)
    }

    #[tokio::test]
    async fn test_skip_produces_no_record() {
        let scratch = tempfile::tempdir().unwrap();
        let rasterizer = ScriptedRasterizer::default();
        let (_, processor) = build_processor(rasterizer.clone(), scratch.path());

        let outcome = processor.process(&InputRow::new("Pune", "MG Road", "0")).await;
        assert_eq!(outcome, RowOutcome::Skipped);
        assert!(rasterizer.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_success_uploads_and_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let rasterizer = ScriptedRasterizer::default();
        let (memory, processor) = build_processor(rasterizer.clone(), scratch.path());

        let outcome = processor.process(&InputRow::new("Pune", "MG Road", VALID)).await;
        let RowOutcome::Completed(record) = outcome else { panic!("row was skipped") };

        assert_eq!(
            record.status,
            RecordStatus::Success {
                file_name: "mg-road-pune.png".to_string(),
                url: "https://static.squareyards.com/localitymap-thumbnail/mg-road-pune.png".to_string(),
            }
        );

        memory
            .head(&ObjectPath::from("localitymap-thumbnail/mg-road-pune.png"))
            .await
            .unwrap();

        let documents = rasterizer.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        assert!(!documents[0].exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_is_error_record() {
        let scratch = tempfile::tempdir().unwrap();
        let (memory, processor) = build_processor(ScriptedRasterizer::default(), scratch.path());

        let outcome = processor.process(&InputRow::new("Pune", "Baner", "!!bad")).await;
        let RowOutcome::Completed(record) = outcome else { panic!("row was skipped") };

        assert!(!record.is_success());
        assert!(matches!(record.status, RecordStatus::Error { ref error } if error.contains("Invalid polyline")));
        assert!(memory.list_with_delimiter(None).await.unwrap().objects.is_empty());
    }

    #[tokio::test]
    async fn test_empty_polygon_is_error_record() {
        let scratch = tempfile::tempdir().unwrap();
        let (_, processor) = build_processor(ScriptedRasterizer::default(), scratch.path());

        let outcome = processor.process(&InputRow::new("Pune", "Baner", "")).await;
        let RowOutcome::Completed(record) = outcome else { panic!("row was skipped") };
        assert_eq!(record.status, RecordStatus::Error { error: "Polygon has no coordinates".to_string() });
    }

    #[tokio::test]
    async fn test_render_failure_removes_document() {
        let scratch = tempfile::tempdir().unwrap();
        let rasterizer = ScriptedRasterizer::failing(2);
        let (_, processor) = build_processor(rasterizer.clone(), scratch.path());

        let polygon = encode(&[Coordinate::new(18.5, 73.8), Coordinate::new(18.6, 73.9)], DEFAULT_PRECISION);
        let outcome = processor.process(&InputRow::new("Pune", "Aundh", polygon)).await;
        let RowOutcome::Completed(record) = outcome else { panic!("row was skipped") };

        assert!(!record.is_success());
        assert_eq!(rasterizer.attempts().len(), 2);
        assert_eq!(rasterizer.closes(), 1);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_error_record() {
        let scratch = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        // a store rooted at a regular file cannot create any object under it
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let broken = LocalFileSystem::new_with_prefix(blocker.path()).unwrap();
        let store = ThumbnailStore::new(Arc::new(broken), "static-site-data", "https://static.squareyards.com");

        let rasterizer = ScriptedRasterizer::default();
        let processor = RowProcessor::new(rasterizer.clone(), store, RenderSettings::default())
            .with_scratch_dir(scratch.path());

        let mut manifest = crate::manifest::ManifestWriter::create_in(output.path()).unwrap();
        let rows = [InputRow::new("Pune", "MG Road", VALID)];
        let summary = crate::pipeline::run_batch(&processor, &rows, &mut manifest, |_| {}).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(matches!(summary.errors[0].status, RecordStatus::Error { ref error } if error.starts_with("Storage error")));
        assert_eq!(manifest.rows(), 0);
        assert_eq!(rasterizer.attempts(), vec![crate::render::WaitCondition::NetworkIdle]);
        assert_eq!(rasterizer.closes(), 1);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
