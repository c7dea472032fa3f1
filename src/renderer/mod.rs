//! Page rendering.
//!
//! The crawler only needs one capability from a browser: load a URL, let
//! client-side script build the navigation, expand collapsed groups, and
//! hand back the resulting DOM as HTML. [`PageRenderer`] captures that
//! contract; [`ChromiumRenderer`] implements it over a single chromiumoxide
//! session that the crawler owns exclusively for the crawl's duration.

pub mod browser;
pub mod js;

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::SetCookieParams;
use chromiumoxide::page::Page;
use log::{debug, warn};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::CrawlConfig;
use crate::error::RenderError;

/// Renders one URL and returns the fully rendered DOM as an HTML string.
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render(&self, url: &Url) -> Result<String, RenderError>;
}

/// Maximum passes of the expand-groups script. Nested groups surface new
/// collapsed children, but navigation trees are shallow in practice.
const MAX_EXPAND_PASSES: u32 = 3;

/// Production renderer over a headless (or headful) Chromium session.
pub struct ChromiumRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
    cookie: Option<(String, String)>,
    page_load_timeout: Duration,
    navigation_timeout: Duration,
}

impl ChromiumRenderer {
    /// Launch a browsing session configured for the crawl.
    pub async fn launch(config: &CrawlConfig) -> Result<Self> {
        let (browser, handler_task, user_data_dir) =
            browser::launch_browser(config.headless()).await?;

        let cookie = match config.cookie() {
            Some(raw) => Some(parse_cookie(raw)?),
            None => None,
        };

        Ok(Self {
            browser,
            handler_task,
            user_data_dir,
            cookie,
            page_load_timeout: config.page_load_timeout(),
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Close the browser and remove its profile directory.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser.close().await.context("close browser")?;
        self.handler_task.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            debug!(
                "could not remove browser profile {}: {e}",
                self.user_data_dir.display()
            );
        }
        Ok(())
    }

    async fn install_cookie(&self, page: &Page, url: &Url) -> Result<(), RenderError> {
        let Some((name, value)) = &self.cookie else {
            return Ok(());
        };
        let domain = url
            .host_str()
            .ok_or_else(|| RenderError::Failed(format!("no host in {url}")))?;
        let params = SetCookieParams::builder()
            .name(name.clone())
            .value(value.clone())
            .domain(domain.to_string())
            .path("/".to_string())
            .build()
            .map_err(RenderError::Failed)?;
        page.execute(params)
            .await
            .map_err(|e| RenderError::Failed(format!("set cookie: {e}")))?;
        Ok(())
    }

    /// Poll until `document.readyState` is complete, bounded by the
    /// navigation timeout. `wait_for_navigation` only covers the HTTP
    /// response; script-rendered sidebars appear later.
    async fn wait_for_ready(&self, page: &Page) {
        let start = std::time::Instant::now();
        let poll = Duration::from_millis(100);
        while start.elapsed() < self.navigation_timeout {
            if let Ok(result) = page.evaluate(js::READY_STATE_SCRIPT).await
                && let Ok(value) = result.into_value::<serde_json::Value>()
            {
                let ready = value.get("readyState").and_then(|v| v.as_str());
                let body = value
                    .get("bodyExists")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if ready == Some("complete") && body {
                    return;
                }
            }
            tokio::time::sleep(poll).await;
        }
        warn!("page never reached readyState=complete, proceeding with current DOM");
    }

    /// Expand collapsed navigation groups until a pass opens nothing new.
    async fn expand_nav_groups(&self, page: &Page) {
        for pass in 0..MAX_EXPAND_PASSES {
            let expanded = match page.evaluate(js::EXPAND_NAV_GROUPS_SCRIPT).await {
                Ok(result) => result.into_value::<u64>().unwrap_or(0),
                Err(e) => {
                    debug!("expand-groups script failed on pass {pass}: {e}");
                    return;
                }
            };
            if expanded == 0 {
                return;
            }
            debug!("expanded {expanded} collapsed navigation groups (pass {pass})");
            // Give the framework time to mount the revealed children
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
    }
}

impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &Url) -> Result<String, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Failed(format!("create page: {e}")))?;

        let result = self.render_on_page(&page, url).await;

        // Close regardless of outcome so pages never accumulate in the session
        if let Err(e) = page.close().await {
            debug!("failed to close page for {url}: {e}");
        }

        result
    }
}

impl ChromiumRenderer {
    async fn render_on_page(&self, page: &Page, url: &Url) -> Result<String, RenderError> {
        self.install_cookie(page, url).await?;

        with_timeout(self.page_load_timeout, async {
            page.goto(url.as_str())
                .await
                .map_err(|e| RenderError::Failed(format!("navigate: {e}")))?;
            Ok(())
        })
        .await?;

        with_timeout(self.navigation_timeout, async {
            page.wait_for_navigation()
                .await
                .map_err(|e| RenderError::Failed(format!("page load: {e}")))?;
            Ok(())
        })
        .await?;

        self.wait_for_ready(page).await;
        self.expand_nav_groups(page).await;

        page.content()
            .await
            .map_err(|e| RenderError::Failed(format!("read content: {e}")))
    }
}

async fn with_timeout<F>(limit: Duration, operation: F) -> Result<(), RenderError>
where
    F: Future<Output = Result<(), RenderError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout(limit)),
    }
}

/// Split a `name=value` cookie string.
fn parse_cookie(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("cookie must be in name=value form, got {raw:?}"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}
