use std::sync::Arc;

use locality_thumbnails::api::{create_router, AppState};
use locality_thumbnails::{telemetry, ChromeRasterizer, Config, RowProcessor, ThumbnailStore};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = run().await {
        if e.is_setup() {
            error!("setup failed, nothing was processed: {}", e);
            std::process::exit(2);
        }
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> locality_thumbnails::Result<()> {
    let config = Config::from_env()?;

    let store = ThumbnailStore::connect_gcs(&config.credentials_json, &config.bucket, &config.public_base_url)?;
    store.verify().await?;
    info!(bucket = %config.bucket, "connected to cloud storage");
    info!(path = %config.browser_path.display(), "browser found");

    let processor = RowProcessor::new(ChromeRasterizer::new(&config.browser_path), store, config.render)
        .with_scratch_dir(&config.scratch_dir);
    let browser = processor.rasterizer().executable().display().to_string();
    let state = Arc::new(AppState::new(processor, browser));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("Polygon map generator listening on http://{}", config.bind_addr);
    info!("  POST /api/upload    (multipart/form-data: csv file)");
    info!("  POST /api/generate");
    info!("  GET  /api/progress");
    info!("  GET  /api/download");

    axum::serve(listener, app).await?;
    Ok(())
}
