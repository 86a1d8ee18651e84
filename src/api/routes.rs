use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::render::Rasterizer;
use super::handlers::*;

pub fn create_router<R>(state: Arc<AppState<R>>) -> Router
where
    R: Rasterizer + Send + Sync + 'static,
{
    Router::new()
        .route("/api/health", get(health::<R>))
        .route("/api/upload", post(upload_csv::<R>))
        .route("/api/generate", post(generate_maps::<R>))
        .route("/api/progress", get(get_progress::<R>))
        .route("/api/download", get(download_manifest::<R>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB limit
                .layer(CorsLayer::permissive())
        )
        .with_state(state)
}
