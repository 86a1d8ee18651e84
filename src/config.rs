//! Startup configuration read from the environment
//!
//! Missing credentials or a missing browser binary are setup errors: the
//! session stops before any row is processed.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::render::RenderSettings;

pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const BUCKET_VAR: &str = "THUMBNAIL_BUCKET";
pub const PUBLIC_BASE_URL_VAR: &str = "THUMBNAIL_PUBLIC_BASE_URL";
pub const BROWSER_VAR: &str = "BROWSER_EXECUTABLE_PATH";
pub const SCRATCH_DIR_VAR: &str = "THUMBNAIL_SCRATCH_DIR";
pub const BIND_ADDR_VAR: &str = "THUMBNAIL_BIND_ADDR";

pub const DEFAULT_BUCKET: &str = "static-site-data";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://static.squareyards.com";
pub const DEFAULT_BROWSER: &str = "/usr/bin/chromium-browser";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Alternate install locations searched when the configured browser is absent
pub const BROWSER_FALLBACKS: [&str; 3] = [
    "/usr/bin/chromium",
    "/usr/lib/chromium-browser/chromium-browser",
    "/usr/bin/chromium-browser",
];

/// Everything resolved once at startup
#[derive(Clone)]
pub struct Config {
    /// Service-account JSON contents
    pub credentials_json: String,
    pub bucket: String,
    pub public_base_url: String,
    pub browser_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub render: RenderSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("credentials_json", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .field("browser_path", &self.browser_path)
            .field("scratch_dir", &self.scratch_dir)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Config {
    /// Loads configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), |path| path.exists())
    }

    /// Loads configuration from an arbitrary variable source
    ///
    /// `exists` decides whether a browser path is installed.
    pub fn from_lookup<L, E>(lookup: L, exists: E) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
        E: Fn(&Path) -> bool,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let credentials_json = get(CREDENTIALS_VAR).ok_or_else(|| {
            Error::Config(format!("credentials not found in environment variable {}", CREDENTIALS_VAR))
        })?;

        let preferred = get(BROWSER_VAR).unwrap_or_else(|| DEFAULT_BROWSER.to_string());
        let browser_path = resolve_browser(Path::new(&preferred), &BROWSER_FALLBACKS, exists)?;

        let bind = get(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid {} {:?}: {}", BIND_ADDR_VAR, bind, e)))?;

        Ok(Self {
            credentials_json,
            bucket: get(BUCKET_VAR).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            public_base_url: get(PUBLIC_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            browser_path,
            scratch_dir: get(SCRATCH_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            bind_addr,
            render: RenderSettings::default(),
        })
    }
}

/// Picks the preferred browser path, else the first installed fallback
pub fn resolve_browser<E>(preferred: &Path, fallbacks: &[&str], exists: E) -> Result<PathBuf>
where
    E: Fn(&Path) -> bool,
{
    if exists(preferred) {
        return Ok(preferred.to_path_buf());
    }

    fallbacks
        .iter()
        .map(Path::new)
        .find(|candidate| exists(candidate))
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            Error::Config(format!(
                "browser not found at {} or any of: {}",
                preferred.display(),
                fallbacks.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(CREDENTIALS_VAR, "{}")]), |_| true).unwrap();
        assert_eq!(config.bucket, "static-site-data");
        assert_eq!(config.public_base_url, "https://static.squareyards.com");
        assert_eq!(config.browser_path, PathBuf::from(DEFAULT_BROWSER));
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn test_missing_credentials_is_setup_error() {
        let err = Config::from_lookup(lookup(&[]), |_| true).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains(CREDENTIALS_VAR));

        let blank = Config::from_lookup(lookup(&[(CREDENTIALS_VAR, "  ")]), |_| true);
        assert!(blank.is_err());
    }

    #[test]
    fn test_browser_fallback() {
        let config = Config::from_lookup(
            lookup(&[(CREDENTIALS_VAR, "{}"), (BROWSER_VAR, "/opt/missing/chrome")]),
            |path| path == Path::new("/usr/lib/chromium-browser/chromium-browser"),
        )
        .unwrap();
        assert_eq!(
            config.browser_path,
            PathBuf::from("/usr/lib/chromium-browser/chromium-browser")
        );
    }

    #[test]
    fn test_missing_browser_is_setup_error() {
        let err = Config::from_lookup(lookup(&[(CREDENTIALS_VAR, "{}")]), |_| false).unwrap_err();
        assert!(err.is_setup());
    }

    #[test]
    fn test_invalid_bind_addr() {
        let result = Config::from_lookup(
            lookup(&[(CREDENTIALS_VAR, "{}"), (BIND_ADDR_VAR, "nowhere")]),
            |_| true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = Config::from_lookup(lookup(&[(CREDENTIALS_VAR, "secret-key")]), |_| true).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
