//! Chromium-based renderer using chromiumoxide.

use super::{ContextOptions, RenderContext, Renderer, WaitUntil};
use crate::error::Result;
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetScriptExecutionDisabledParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";

/// Launch settings for the headless browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Explicit Chrome/Chromium binary; autodetected when `None`.
    pub executable: Option<PathBuf>,
    pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            navigation_timeout: Duration::from_secs(45),
        }
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch(options: BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if let Some(path) = options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            handler,
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Close the browser process and stop its event loop.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .context("failed to close Chromium")?;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let viewport = options.viewport;
        page.execute(SetDeviceMetricsOverrideParams::new(
            viewport.width as i64,
            viewport.height as i64,
            viewport.device_scale_factor,
            viewport.mobile,
        ))
        .await
        .context("failed to set viewport")?;

        if !options.javascript_enabled {
            page.execute(SetScriptExecutionDisabledParams::new(true))
                .await
                .context("failed to disable scripting")?;
        }

        Ok(Box::new(ChromiumContext {
            page,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    navigation_timeout: Duration,
}

impl ChromiumContext {
    /// Poll the resource timeline until it stops growing for `quiet`.
    async fn wait_for_network_idle(&self, quiet: Duration, deadline: Instant) -> anyhow::Result<()> {
        let poll = Duration::from_millis(100);
        let mut last_count: i64 = -1;
        let mut stable_since = Instant::now();

        loop {
            let count: i64 = self
                .page
                .evaluate(RESOURCE_COUNT_JS)
                .await
                .context("failed to read resource timeline")?
                .into_value()
                .map_err(|e| anyhow!("failed to convert resource count: {e:?}"))?;

            let now = Instant::now();
            if count != last_count {
                last_count = count;
                stable_since = now;
            } else if now.duration_since(stable_since) >= quiet {
                debug!("Network idle after {} resources", count);
                return Ok(());
            }

            if now >= deadline {
                bail!("network did not go idle before the navigation timeout");
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<()> {
        let deadline = Instant::now() + self.navigation_timeout;

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(anyhow!("navigation to {url} failed: {e}").into()),
            Err(_) => {
                return Err(anyhow!(
                    "navigation to {url} timed out after {:?}",
                    self.navigation_timeout
                )
                .into());
            }
        }

        // goto() already waited for the load event, which covers DOMContentLoaded
        if let WaitUntil::NetworkIdle { quiet } = wait {
            self.wait_for_network_idle(quiet, deadline).await?;
        }
        Ok(())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        let value = result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))?;
        Ok(value)
    }

    async fn content(&self) -> Result<String> {
        let html = self.page.content().await.context("failed to get HTML")?;
        Ok(html)
    }

    async fn title(&self) -> Result<Option<String>> {
        let title = self
            .page
            .get_title()
            .await
            .context("failed to get title")?;
        Ok(title)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close page")?;
        Ok(())
    }
}
