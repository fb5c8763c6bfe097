// src/capture/chromium.rs
//! Headless Chromium backend over CDP.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserLauncher, BrowserSession, CaptureError, CaptureSettings};

#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    pub chrome_path: Option<PathBuf>,
    /// Needed when running as root inside containers.
    pub no_sandbox: bool,
}

impl ChromiumLauncher {
    pub fn from_env() -> Self {
        Self {
            chrome_path: std::env::var("CHROME_PATH").ok().map(PathBuf::from),
            no_sandbox: std::env::var("CHROME_NO_SANDBOX")
                .ok()
                .is_some_and(|v| v == "1"),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn BrowserSession>, CaptureError> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(CaptureError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::Launch(e.to_string()))?;

        // CDP events must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(ev) = handler.next().await {
                if ev.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            page: None,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, CaptureError> {
        self.page
            .as_ref()
            .ok_or_else(|| CaptureError::Capture("no page open".into()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        let nav_err = |e: chromiumoxide::error::CdpError| CaptureError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let page = self.browser.new_page(url).await.map_err(nav_err)?;
        page.wait_for_navigation().await.map_err(nav_err)?;
        self.page = Some(page);
        Ok(())
    }

    async fn capture_element(&mut self, selector: &str) -> Result<Option<Vec<u8>>, CaptureError> {
        let page = self.page()?;
        let found = page
            .find_elements(selector)
            .await
            .map_err(|e| CaptureError::Capture(e.to_string()))?;
        let Some(element) = found.into_iter().next() else {
            return Ok(None);
        };
        let bytes = element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| CaptureError::Capture(e.to_string()))?;
        Ok(Some(bytes))
    }

    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        self.page()?
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::Capture(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), CaptureError> {
        let ChromiumSession {
            mut browser,
            handler_task,
            page,
        } = *self;
        drop(page);
        let closed = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();
        closed
            .map(|_| ())
            .map_err(|e| CaptureError::Capture(format!("browser close: {e}")))
    }
}
