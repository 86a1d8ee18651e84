//! locality-thumbnails - polygon map thumbnails from a spreadsheet
//!
//! Each spreadsheet row carries an encoded polyline. The polygon is framed
//! on a map with its sublocation label, rasterized by a headless browser,
//! uploaded to object storage, and recorded in a CSV manifest that maps
//! the row to the image's public URL.
//!
//! # Examples
//!
//! ## Decoding and framing a polygon
//!
//! ```
//! use locality_thumbnails::{codec::polyline, BoundingBox};
//!
//! let coords = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", polyline::DEFAULT_PRECISION)?;
//! let bbox = BoundingBox::from_coordinates(&coords)?;
//!
//! assert!(bbox.min_lat <= bbox.max_lat);
//! println!("center: {:?}", bbox.center());
//! # Ok::<(), locality_thumbnails::Error>(())
//! ```
//!
//! ## Running a batch
//!
//! ```no_run
//! use locality_thumbnails::{
//!     input, run_batch, ChromeRasterizer, Config, ManifestWriter, RowProcessor, ThumbnailStore,
//! };
//!
//! # async fn run() -> locality_thumbnails::Result<()> {
//! let config = Config::from_env()?;
//! let store = ThumbnailStore::connect_gcs(&config.credentials_json, &config.bucket, &config.public_base_url)?;
//! let processor = RowProcessor::new(ChromeRasterizer::new(&config.browser_path), store, config.render);
//!
//! let rows = input::read_rows(std::fs::File::open("localities.csv")?)?;
//! let mut manifest = ManifestWriter::create_in(&config.scratch_dir)?;
//! let summary = run_batch(&processor, &rows, &mut manifest, |p| println!("{}/{}", p.processed, p.total)).await;
//!
//! println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//! manifest.finish()?.persist_copy("map_thumbnails_output.csv".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod codec;
pub mod geometry;
pub mod document;
pub mod render;
pub mod storage;
pub mod input;
pub mod manifest;
pub mod pipeline;
pub mod config;
pub mod telemetry;
pub mod api;

pub use error::{Error, Result};
pub use types::{InputRow, ManifestEntry, Progress, RecordStatus, ResultRecord, SKIP_SENTINEL};
pub use geometry::{BoundingBox, Coordinate};
pub use document::{MapDocument, MapLayout, PolygonStyle};
pub use render::{
    BrowserSession, ChromeRasterizer, Rasterizer, RenderSettings, Viewport, WaitCondition, WaitStrategy,
};
pub use storage::{thumbnail_file_name, ThumbnailStore, THUMBNAIL_PREFIX};
pub use manifest::{Manifest, ManifestWriter};
pub use pipeline::{run_batch, BatchSummary, RowOutcome, RowProcessor};
pub use config::Config;
