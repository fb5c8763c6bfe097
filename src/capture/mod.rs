// src/capture/mod.rs
//! Screenshot capture of a single post page.
//!
//! Per attempt: launch an isolated session, navigate, let the page settle,
//! capture the first content element found, else the visible viewport.
//! The session is closed once on every path after a successful launch.

pub mod artifacts;
#[cfg(feature = "browser")]
pub mod chromium;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

pub use artifacts::{artifact_filename, ArtifactDir};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("screenshot failed: {0}")]
    Capture(String),

    #[error("writing capture to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Only the detected content element.
    Targeted,
    /// Visible viewport, used when no content element could be captured.
    Viewport,
}

#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub mode: CaptureMode,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout: Duration,
    /// Extra wait after load; network-idle is unreliable on script-rendered pages.
    pub settle_delay: Duration,
    /// Probed in order, first present element wins.
    pub content_selectors: Vec<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            viewport_width: 1200,
            viewport_height: 800,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            content_selectors: vec!["article".into(), r#"[data-testid="tweet"]"#.into()],
        }
    }
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError>;
    /// `Ok(None)` when nothing matches `selector`.
    async fn capture_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>, CaptureError>;
    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError>;
    async fn close(self: Box<Self>) -> Result<(), CaptureError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, settings: &CaptureSettings)
        -> Result<Box<dyn BrowserSession>, CaptureError>;
}

pub struct CaptureEngine {
    launcher: Box<dyn BrowserLauncher>,
    settings: CaptureSettings,
}

impl CaptureEngine {
    pub fn new(launcher: Box<dyn BrowserLauncher>, settings: CaptureSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Capture `url` into `target`. Errors are logged and reported as `false`.
    pub async fn capture(&self, url: &str, target: &Path) -> bool {
        match self.try_capture(url, target).await {
            Ok(_) => true,
            Err(e) => {
                warn!(%url, error = %e, "capture failed");
                counter!("capture_failed_total").increment(1);
                false
            }
        }
    }

    pub async fn try_capture(
        &self,
        url: &str,
        target: &Path,
    ) -> Result<CaptureArtifact, CaptureError> {
        let mut session = self.launcher.launch(&self.settings).await?;
        let shot = self.shoot(&mut session, url).await;
        if let Err(e) = session.close().await {
            warn!(%url, error = %e, "closing browser session failed");
        }
        let (bytes, mode) = shot?;

        tokio::fs::write(target, &bytes)
            .await
            .map_err(|source| CaptureError::Io {
                path: target.to_path_buf(),
                source,
            })?;

        let filename = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(%url, file = %filename, ?mode, bytes = bytes.len(), "capture saved");

        Ok(CaptureArtifact {
            filename,
            path: target.to_path_buf(),
            bytes,
            mode,
        })
    }

    async fn shoot(
        &self,
        session: &mut Box<dyn BrowserSession>,
        url: &str,
    ) -> Result<(Vec<u8>, CaptureMode), CaptureError> {
        match tokio::time::timeout(self.settings.navigation_timeout, session.navigate(url)).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(CaptureError::Navigation {
                    url: url.to_string(),
                    reason: format!("timed out after {:?}", self.settings.navigation_timeout),
                })
            }
        }
        tokio::time::sleep(self.settings.settle_delay).await;

        for selector in &self.settings.content_selectors {
            match session.capture_element(selector).await {
                Ok(Some(bytes)) if !bytes.is_empty() => {
                    return Ok((bytes, CaptureMode::Targeted));
                }
                Ok(Some(_)) => {
                    warn!(%url, %selector, "element capture was empty, using viewport");
                    break;
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(%url, %selector, error = %e, "element capture failed, using viewport");
                    break;
                }
            }
        }

        counter!("capture_fallback_total").increment(1);
        let bytes = session.capture_viewport().await?;
        if bytes.is_empty() {
            return Err(CaptureError::Capture("viewport image was empty".into()));
        }
        Ok((bytes, CaptureMode::Viewport))
    }
}
