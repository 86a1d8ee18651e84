//! Output manifest, written incrementally as rows complete

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::Result;
use crate::types::ManifestEntry;

/// Fixed manifest header
pub const MANIFEST_HEADER: [&str; 4] = ["SubLocation", "City", "Image File Name", "Image URL"];

/// File name offered to the operator on download
pub const DOWNLOAD_FILE_NAME: &str = "map_thumbnails_output.csv";

/// Append-only CSV writer backed by a temporary file
pub struct ManifestWriter {
    writer: csv::Writer<File>,
    file: NamedTempFile,
    rows: usize,
}

impl ManifestWriter {
    /// Creates the manifest file in `dir` and writes the header
    pub fn create_in(dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("manifest-")
            .suffix(".csv")
            .tempfile_in(dir)?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(file.reopen()?);
        writer.write_record(MANIFEST_HEADER)?;
        writer.flush()?;

        Ok(Self { writer, file, rows: 0 })
    }

    /// Appends one row and flushes it to disk
    pub fn append(&mut self, entry: &ManifestEntry) -> Result<()> {
        self.writer.serialize(entry)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and hands the file off for download
    pub fn finish(mut self) -> Result<Manifest> {
        self.writer.flush()?;
        Ok(Manifest {
            file: self.file,
            rows: self.rows,
        })
    }
}

/// A completed manifest waiting in temporary storage
#[derive(Debug)]
pub struct Manifest {
    file: NamedTempFile,
    rows: usize,
}

impl Manifest {
    /// Path of the manifest file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of data rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Reads the manifest contents and deletes the file
    pub fn take_bytes(self) -> Result<Vec<u8>> {
        let bytes = std::fs::read(self.file.path())?;
        discard(self.file);
        Ok(bytes)
    }

    /// Copies the manifest to `destination` and deletes the temporary file
    pub fn persist_copy(self, destination: &Path) -> Result<()> {
        std::fs::copy(self.file.path(), destination)?;
        discard(self.file);
        Ok(())
    }
}

fn discard(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!(path = %path.display(), error = %e, "failed to remove manifest file");
    }
}
