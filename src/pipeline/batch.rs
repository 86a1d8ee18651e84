//! Batch driver
//!
//! Rows run strictly one after another. A failed row never stops the
//! batch; only successes reach the manifest.

use serde::Serialize;
use tracing::{info, warn};

use crate::manifest::ManifestWriter;
use crate::render::Rasterizer;
use crate::types::{InputRow, Progress, ResultRecord};
use super::row::{RowOutcome, RowProcessor};

/// Counts and error records for a finished batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<ResultRecord>,
}

/// Processes every row in order, appending successes to `manifest`
///
/// `on_progress` is called before each row with the row's label and after
/// each row with the updated count.
pub async fn run_batch<R, F>(
    processor: &RowProcessor<R>,
    rows: &[InputRow],
    manifest: &mut ManifestWriter,
    mut on_progress: F,
) -> BatchSummary
where
    R: Rasterizer + Sync,
    F: FnMut(Progress) + Send,
{
    let total = rows.len();
    let mut summary = BatchSummary { total, ..Default::default() };

    for (index, row) in rows.iter().enumerate() {
        info!("Processing {}/{}: {}, {}", index + 1, total, row.sublocation, row.city);
        on_progress(Progress {
            processed: index,
            total,
            current: Some(format!("{}, {}", row.sublocation, row.city)),
        });

        match processor.process(row).await {
            RowOutcome::Skipped => summary.skipped += 1,
            RowOutcome::Completed(record) => match record.manifest_entry() {
                Some(entry) => match manifest.append(&entry) {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        warn!(sublocation = %row.sublocation, error = %e, "failed to append manifest row");
                        summary.failed += 1;
                        summary.errors.push(ResultRecord::error(row, e.to_string()));
                    }
                },
                None => {
                    summary.failed += 1;
                    summary.errors.push(record);
                }
            },
        }

        on_progress(Progress {
            processed: index + 1,
            total,
            current: None,
        });
    }

    info!(
        total,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Processing complete"
    );
    summary
}
