//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

pub use chromium::{BrowserOptions, ChromiumRenderer};

/// Device metrics applied to every context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

impl Viewport {
    /// A modern phone; both analysis passes use it so their layouts match.
    pub const MOBILE: Viewport = Viewport {
        width: 390,
        height: 844,
        device_scale_factor: 3.0,
        mobile: true,
    };
}

/// How a context is configured when it is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextOptions {
    pub javascript_enabled: bool,
    pub viewport: Viewport,
}

impl ContextOptions {
    pub fn scripted() -> Self {
        Self {
            javascript_enabled: true,
            viewport: Viewport::MOBILE,
        }
    }

    pub fn static_only() -> Self {
        Self {
            javascript_enabled: false,
            viewport: Viewport::MOBILE,
        }
    }
}

/// When navigation is considered finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitUntil {
    /// The document has been parsed.
    DomContentLoaded,
    /// No new network activity for the quiet window.
    NetworkIdle { quiet: Duration },
}

impl WaitUntil {
    pub fn network_idle() -> Self {
        WaitUntil::NetworkIdle {
            quiet: Duration::from_millis(500),
        }
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new, isolated browser context (tab).
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL and wait for the requested load state.
    async fn navigate(&mut self, url: &str, wait: WaitUntil) -> Result<()>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Serialized markup of the live document.
    async fn content(&self) -> Result<String>;
    /// The document title, if any.
    async fn title(&self) -> Result<Option<String>>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Open a scripted context, wait for the network to settle on `url` and
/// return the live markup. The context is closed whatever the outcome.
pub async fn render_live_html(renderer: &dyn Renderer, url: &str) -> Result<String> {
    let mut ctx = renderer.new_context(&ContextOptions::scripted()).await?;

    let outcome = match ctx.navigate(url, WaitUntil::network_idle()).await {
        Ok(()) => ctx.content().await,
        Err(e) => Err(e),
    };

    if let Err(e) = ctx.close().await {
        warn!("Failed to close render context for {}: {}", url, e);
    }
    outcome
}

/// Renderer used when no browser is available. Every context request fails,
/// which the callers treat as a render failure.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self, _options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        Err(ScanError::Render("browser not available".to_string()))
    }
}
