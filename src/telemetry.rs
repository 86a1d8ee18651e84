//! Logging setup shared by both binaries

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global fmt subscriber, honouring `RUST_LOG` (default `info`)
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
