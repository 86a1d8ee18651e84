use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use locality_thumbnails::manifest::DOWNLOAD_FILE_NAME;
use locality_thumbnails::{
    input, run_batch, telemetry, ChromeRasterizer, Config, ManifestWriter, RowProcessor, ThumbnailStore,
};
use tracing::{error, info, warn};

/// Render polygon map thumbnails for every row of a CSV and publish them
#[derive(Debug, Parser)]
#[command(name = "locality-thumbnails", version)]
struct Cli {
    /// Input CSV with CityName, SubLocationName and Polygon columns
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Where to write the output manifest
    #[arg(short, long, value_name = "PATH", default_value = DOWNLOAD_FILE_NAME)]
    output: PathBuf,
}

#[tokio::main]
async fn main() {
    telemetry::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if e.is_setup() {
            error!("setup failed, nothing was processed: {}", e);
            std::process::exit(2);
        }
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> locality_thumbnails::Result<()> {
    let config = Config::from_env()?;

    let store = ThumbnailStore::connect_gcs(&config.credentials_json, &config.bucket, &config.public_base_url)?;
    store.verify().await?;
    info!(bucket = %config.bucket, "connected to cloud storage");

    let processor = RowProcessor::new(ChromeRasterizer::new(&config.browser_path), store, config.render)
        .with_scratch_dir(&config.scratch_dir);

    let rows = input::read_rows(File::open(&cli.input)?)?;
    let mut manifest = ManifestWriter::create_in(&config.scratch_dir)?;

    let summary = run_batch(&processor, &rows, &mut manifest, |progress| {
        if progress.current.is_none() {
            info!("{:.0}% complete", progress.fraction() * 100.0);
        }
    })
    .await;

    for record in &summary.errors {
        warn!(sublocation = %record.sublocation, city = %record.city, "row failed: {:?}", record.status);
    }

    manifest.finish()?.persist_copy(&cli.output)?;
    info!(
        path = %cli.output.display(),
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "manifest written"
    );
    Ok(())
}
