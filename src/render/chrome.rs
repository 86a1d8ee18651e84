//! Chromium driven in headless screenshot mode
//!
//! Each session owns a throwaway profile directory that also holds the
//! screenshot file. Every capture is a separate browser process that is
//! killed if it overruns the wait budget.
//!
//! `--screenshot` captures the window, not the scrollable page. The map
//! document pins `#map` to fill the window and never scrolls, so a
//! capture at the configured viewport is the full page.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use super::{BrowserSession, Rasterizer, Viewport, WaitCondition, WaitStrategy, PNG_SIGNATURE};

const CHROME_FLAGS: &[&str] = &[
    "--headless=new",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-web-security",
    "--disable-features=VizDisplayCompositor",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--hide-scrollbars",
    "--no-first-run",
];

/// Launches Chromium sessions from a fixed executable
#[derive(Debug, Clone)]
pub struct ChromeRasterizer {
    executable: PathBuf,
}

impl ChromeRasterizer {
    /// Creates a rasterizer for the browser at `executable`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    /// Path of the browser binary
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Rasterizer for ChromeRasterizer {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession> {
        let profile = tempfile::Builder::new()
            .prefix("chrome-profile-")
            .tempdir()?;

        Ok(ChromeSession {
            executable: self.executable.clone(),
            profile,
        })
    }
}

/// One browser context backed by a temporary profile directory
#[derive(Debug)]
pub struct ChromeSession {
    executable: PathBuf,
    profile: TempDir,
}

impl ChromeSession {
    fn screenshot_path(&self) -> PathBuf {
        self.profile.path().join("screenshot.png")
    }

    fn command(&self, document: &Path, viewport: Viewport, wait: &WaitStrategy) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(CHROME_FLAGS)
            .arg(format!("--user-data-dir={}", self.profile.path().display()))
            .arg(format!("--window-size={},{}", viewport.width, viewport.height))
            .arg(format!("--screenshot={}", self.screenshot_path().display()));

        let settle_ms = wait.settle.as_millis();
        match wait.condition {
            WaitCondition::NetworkIdle => {
                // virtual time only advances once pending fetches have finished
                command
                    .arg("--run-all-compositor-stages-before-draw")
                    .arg(format!("--virtual-time-budget={}", settle_ms));
            }
            WaitCondition::DomContentLoaded => {
                command.arg(format!("--timeout={}", settle_ms));
            }
        }

        command
            .arg(format!("file://{}", document.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl BrowserSession for ChromeSession {
    async fn capture(
        &mut self,
        document: &Path,
        viewport: Viewport,
        wait: &WaitStrategy,
    ) -> Result<Vec<u8>> {
        let screenshot = self.screenshot_path();
        let child = self.command(document, viewport, wait).spawn().map_err(|e| {
            Error::Render(format!("failed to launch {}: {}", self.executable.display(), e))
        })?;

        debug!(document = %document.display(), condition = %wait.condition, "capturing");

        let output = match tokio::time::timeout(wait.timeout + wait.settle, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(Error::RenderTimeout {
                    condition: wait.condition,
                    timeout: wait.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(Error::Render(format!(
                "browser exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let png = tokio::fs::read(&screenshot).await.map_err(|e| {
            Error::Render(format!("no screenshot at {}: {}", screenshot.display(), e))
        })?;

        if let Err(e) = tokio::fs::remove_file(&screenshot).await {
            warn!(path = %screenshot.display(), error = %e, "failed to remove screenshot");
        }

        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(Error::Render("screenshot is not a PNG image".to_string()));
        }

        Ok(png)
    }

    async fn close(self) -> Result<()> {
        self.profile.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderSettings;

    fn args(command: &Command) -> Vec<String> {
        command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_network_idle_arguments() {
        let session = ChromeRasterizer::new("/usr/bin/chromium").launch().await.unwrap();
        let settings = RenderSettings::default();
        let args = args(&session.command(Path::new("/tmp/map.html"), settings.viewport, &settings.primary));

        assert!(args.contains(&"--window-size=1200,1200".to_string()));
        assert!(args.contains(&"--virtual-time-budget=2000".to_string()));
        assert_eq!(args.last().unwrap(), "file:///tmp/map.html");
        assert!(args.iter().any(|a| a.starts_with("--screenshot=")));
    }

    #[tokio::test]
    async fn test_content_loaded_arguments() {
        let session = ChromeRasterizer::new("/usr/bin/chromium").launch().await.unwrap();
        let settings = RenderSettings::default();
        let args = args(&session.command(Path::new("/tmp/map.html"), settings.viewport, &settings.fallback));

        assert!(args.contains(&"--timeout=3000".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--virtual-time-budget")));
    }

    #[tokio::test]
    async fn test_missing_executable_is_render_error() {
        let mut session = ChromeRasterizer::new("/nonexistent/chromium").launch().await.unwrap();
        let settings = RenderSettings::default();
        let err = session
            .capture(Path::new("/tmp/map.html"), settings.viewport, &settings.primary)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[tokio::test]
    async fn test_close_removes_profile() {
        let session = ChromeRasterizer::new("/usr/bin/chromium").launch().await.unwrap();
        let profile = session.profile.path().to_path_buf();
        assert!(profile.exists());

        session.close().await.unwrap();
        assert!(!profile.exists());
    }
}
