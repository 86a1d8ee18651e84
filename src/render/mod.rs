//! Rasterization of map documents through a headless browser
//!
//! A [`Rasterizer`] launches one [`BrowserSession`] per document. Capture
//! first waits for network idleness; if that attempt fails it is retried
//! exactly once with the relaxed DOM-content-loaded condition. The session
//! is always closed afterwards, and close failures are only logged.

pub mod chrome;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;

pub use chrome::{ChromeRasterizer, ChromeSession};

/// First bytes of every PNG file
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Page readiness condition awaited before capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Network traffic has settled
    NetworkIdle,
    /// The DOM has been parsed
    DomContentLoaded,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitCondition::NetworkIdle => write!(f, "network idle"),
            WaitCondition::DomContentLoaded => write!(f, "DOM content loaded"),
        }
    }
}

/// One navigation attempt: what to wait for, for how long, and how long to
/// let the map settle before capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStrategy {
    pub condition: WaitCondition,
    pub timeout: Duration,
    pub settle: Duration,
}

impl WaitStrategy {
    /// Network idle, 30 s timeout, 2 s settle
    pub fn network_idle() -> Self {
        Self {
            condition: WaitCondition::NetworkIdle,
            timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
        }
    }

    /// DOM content loaded, 15 s timeout, 3 s settle
    pub fn content_loaded() -> Self {
        Self {
            condition: WaitCondition::DomContentLoaded,
            timeout: Duration::from_secs(15),
            settle: Duration::from_secs(3),
        }
    }
}

/// Browser viewport in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Viewport and wait policy used for every capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub viewport: Viewport,
    pub primary: WaitStrategy,
    pub fallback: WaitStrategy,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport { width: 1200, height: 1200 },
            primary: WaitStrategy::network_idle(),
            fallback: WaitStrategy::content_loaded(),
        }
    }
}

/// Launches browser sessions
pub trait Rasterizer {
    type Session: BrowserSession + Send;

    /// Starts a fresh browser context
    fn launch(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A live browser context that can screenshot local documents
pub trait BrowserSession {
    /// Loads `document` and returns a full-page PNG
    fn capture(
        &mut self,
        document: &Path,
        viewport: Viewport,
        wait: &WaitStrategy,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Releases the browser and its on-disk state
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Renders a document to PNG bytes with the two-tier wait policy
pub async fn rasterize<R: Rasterizer + Sync>(
    rasterizer: &R,
    document: &Path,
    settings: &RenderSettings,
) -> Result<Vec<u8>> {
    let mut session = rasterizer.launch().await?;
    let captured = capture_with_fallback(&mut session, document, settings).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "browser cleanup failed");
    }

    captured
}

async fn capture_with_fallback<S: BrowserSession + Send>(
    session: &mut S,
    document: &Path,
    settings: &RenderSettings,
) -> Result<Vec<u8>> {
    match session.capture(document, settings.viewport, &settings.primary).await {
        Ok(png) => Ok(png),
        Err(e) => {
            warn!(
                error = %e,
                "page load failed waiting for {}, retrying with {}",
                settings.primary.condition,
                settings.fallback.condition
            );
            let png = session.capture(document, settings.viewport, &settings.fallback).await?;
            debug!(bytes = png.len(), "fallback capture succeeded");
            Ok(png)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedRasterizer;
    use super::*;

    fn document() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let rasterizer = ScriptedRasterizer::default();
        let doc = document();

        let png = rasterize(&rasterizer, doc.path(), &RenderSettings::default()).await.unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));
        assert_eq!(rasterizer.attempts(), vec![WaitCondition::NetworkIdle]);
        assert_eq!(rasterizer.closes(), 1);
    }

    #[tokio::test]
    async fn test_single_retry_with_relaxed_condition() {
        let rasterizer = ScriptedRasterizer::failing(1);
        let doc = document();

        rasterize(&rasterizer, doc.path(), &RenderSettings::default()).await.unwrap();
        assert_eq!(
            rasterizer.attempts(),
            vec![WaitCondition::NetworkIdle, WaitCondition::DomContentLoaded]
        );
    }

    #[tokio::test]
    async fn test_fails_after_one_retry_and_still_closes() {
        let rasterizer = ScriptedRasterizer::failing(5);
        let doc = document();

        let err = rasterize(&rasterizer, doc.path(), &RenderSettings::default()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::RenderTimeout { condition: WaitCondition::DomContentLoaded, .. }
        ));
        assert_eq!(rasterizer.attempts().len(), 2);
        assert_eq!(rasterizer.closes(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_not_escalated() {
        let rasterizer = ScriptedRasterizer { fail_close: true, ..Default::default() };
        let doc = document();

        assert!(rasterize(&rasterizer, doc.path(), &RenderSettings::default()).await.is_ok());
        assert_eq!(rasterizer.closes(), 1);
    }

    #[test]
    fn test_default_settings() {
        let settings = RenderSettings::default();
        assert_eq!(settings.viewport, Viewport { width: 1200, height: 1200 });
        assert_eq!(settings.primary.timeout, Duration::from_secs(30));
        assert_eq!(settings.primary.settle, Duration::from_secs(2));
        assert_eq!(settings.fallback.condition, WaitCondition::DomContentLoaded);
        assert_eq!(settings.fallback.timeout, Duration::from_secs(15));
        assert_eq!(settings.fallback.settle, Duration::from_secs(3));
    }
}
