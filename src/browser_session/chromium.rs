//! Chromium-backed page driver
//!
//! Launches Chrome lazily on the first navigation and reuses one tab. A
//! `version()` health check before each navigation detects a crashed
//! browser, which is cleaned up and relaunched.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser_setup::{STEALTH_SCRIPT, launch_browser};
use crate::config::ScannerConfig;
use crate::error::NavigationError;
use crate::extraction::PageContent;

use super::driver::PageDriver;

/// Reads the main document status from the Navigation Timing API
const RESPONSE_STATUS_JS: &str =
    "(() => { const e = performance.getEntriesByType('navigation')[0]; return e && e.responseStatus ? e.responseStatus : null; })()";

/// Browser process, its CDP handler task and its profile directory
///
/// The handler must be aborted when the browser goes away, or it keeps
/// running after the process exits.
struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    /// Profile directories we created are removed; configured ones are kept
    owns_data_dir: bool,
}

impl BrowserWrapper {
    /// Close the process, wait for it to exit, then remove the profile
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        self.cleanup_data_dir();
    }

    /// Must run after `browser.wait()` so Chrome has released its file handles
    fn cleanup_data_dir(&mut self) {
        let Some(path) = self.user_data_dir.take() else {
            return;
        };
        if !self.owns_data_dir {
            return;
        }
        debug!("Cleaning up Chrome data directory: {}", path.display());
        if let Err(e) = std::fs::remove_dir_all(&path) {
            warn!(
                "Failed to clean up Chrome data directory {}: {e}. Manual cleanup may be required.",
                path.display()
            );
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() && self.owns_data_dir {
            warn!("Browser dropped without shutdown - removing profile directory in Drop");
            self.cleanup_data_dir();
        }
    }
}

struct ChromeState {
    wrapper: BrowserWrapper,
    page: Page,
}

/// Run a browser operation under a timeout
async fn with_page_timeout<F, T>(operation: F, url: &str, timeout_secs: u64) -> Result<T, NavigationError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result.map_err(|e| classify_cdp_error(url, &e)),
        Err(_) => Err(NavigationError::Timeout {
            url: url.to_string(),
            secs: timeout_secs,
        }),
    }
}

/// Chrome reports network failures as `net::ERR_*` in the navigation error
fn classify_cdp_error(url: &str, err: &anyhow::Error) -> NavigationError {
    let message = format!("{err:#}");
    if let Some(pos) = message.find("net::ERR_") {
        let reason = message[pos..]
            .split_whitespace()
            .next()
            .unwrap_or("net::ERR_FAILED")
            .to_string();
        NavigationError::Network {
            url: url.to_string(),
            reason,
        }
    } else {
        NavigationError::Browser(message)
    }
}

pub struct ChromiumDriver {
    headless: bool,
    chrome_data_dir: Option<PathBuf>,
    page_load_timeout_secs: u64,
    page_settle: Duration,
    state: Mutex<Option<ChromeState>>,
}

impl ChromiumDriver {
    /// Create a driver. Chrome is not launched until the first navigation.
    #[must_use]
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            headless: config.headless(),
            chrome_data_dir: config.chrome_data_dir().cloned(),
            page_load_timeout_secs: config.page_load_timeout_secs(),
            page_settle: config.page_settle(),
            state: Mutex::new(None),
        }
    }

    async fn launch(&self) -> anyhow::Result<ChromeState> {
        info!("Launching browser (first use or after recovery)");
        let owns_data_dir = self.chrome_data_dir.is_none();
        let (browser, handler, user_data_dir) =
            launch_browser(self.headless, self.chrome_data_dir.clone()).await?;
        let wrapper = BrowserWrapper {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
            owns_data_dir,
        };

        let page = wrapper
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to create blank page")?;
        prepare_page(&page).await?;

        Ok(ChromeState { wrapper, page })
    }

    /// Return a healthy browser state, relaunching after a crash
    async fn ensure_running<'a>(
        &self,
        guard: &'a mut Option<ChromeState>,
    ) -> Result<&'a Page, NavigationError> {
        if let Some(state) = guard.as_ref()
            && let Err(e) = state.wrapper.browser.version().await
        {
            warn!("Browser health check failed: {e}. Triggering recovery...");
            if let Some(crashed) = guard.take() {
                crashed.wrapper.shutdown().await;
            }
        }

        if guard.is_none() {
            let state = self
                .launch()
                .await
                .map_err(|e| NavigationError::Browser(format!("{e:#}")))?;
            *guard = Some(state);
        }

        guard
            .as_ref()
            .map(|state| &state.page)
            .ok_or_else(|| NavigationError::Browser("browser unavailable".into()))
    }
}

/// Viewport and stealth script for every document the tab loads
async fn prepare_page(page: &Page) -> anyhow::Result<()> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams {
        source: STEALTH_SCRIPT.to_string(),
        include_command_line_api: None,
        world_name: None,
        run_immediately: None,
    })
    .await
    .context("Failed to register stealth script")?;

    page.execute(
        SetDeviceMetricsOverrideParams::builder()
            .width(1920)
            .height(1080)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(anyhow::Error::msg)?,
    )
    .await
    .context("Failed to set viewport")?;

    Ok(())
}

async fn read_page(page: &Page, requested: &str) -> anyhow::Result<PageContent> {
    let html = page.content().await.context("Failed to read page content")?;
    let url = page
        .url()
        .await
        .context("Failed to read page URL")?
        .unwrap_or_else(|| requested.to_string());
    let status = match page.evaluate(RESPONSE_STATUS_JS).await {
        Ok(result) => result.into_value::<Option<u16>>().unwrap_or(None),
        Err(e) => {
            debug!("Could not read response status for {url}: {e}");
            None
        }
    };
    Ok(PageContent { url, html, status })
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<PageContent, NavigationError> {
        let mut guard = self.state.lock().await;
        let page = self.ensure_running(&mut guard).await?;

        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .with_context(|| format!("Failed to navigate to {url}"))?;
                page.wait_for_navigation()
                    .await
                    .context("Failed waiting for page load")?;
                Ok(())
            },
            url,
            self.page_load_timeout_secs,
        )
        .await?;

        // client-side rendered boards fill the list after `load`
        if !self.page_settle.is_zero() {
            tokio::time::sleep(self.page_settle).await;
        }

        with_page_timeout(read_page(page, url), url, self.page_load_timeout_secs).await
    }

    async fn content(&self) -> Result<PageContent, NavigationError> {
        let guard = self.state.lock().await;
        let Some(state) = guard.as_ref() else {
            return Ok(PageContent {
                url: "about:blank".into(),
                html: String::new(),
                status: None,
            });
        };
        with_page_timeout(
            read_page(&state.page, "about:blank"),
            "about:blank",
            self.page_load_timeout_secs,
        )
        .await
    }

    async fn shutdown(&self) {
        let mut guard = self.state.lock().await;
        if let Some(state) = guard.take() {
            info!("Shutting down browser");
            drop(state.page);
            state.wrapper.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_net_errors() {
        let err = anyhow::anyhow!("navigation failed: net::ERR_NAME_NOT_RESOLVED at https://x");
        assert_eq!(
            classify_cdp_error("https://x", &err),
            NavigationError::Network {
                url: "https://x".into(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into()
            }
        );

        let other = anyhow::anyhow!("target closed");
        assert!(matches!(
            classify_cdp_error("https://x", &other),
            NavigationError::Browser(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_navigation_timeout() {
        let result: Result<(), _> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            "https://slow.example",
            5,
        )
        .await;
        assert_eq!(
            result,
            Err(NavigationError::Timeout {
                url: "https://slow.example".into(),
                secs: 5
            })
        );
    }
}
