//! Dual-render analysis of a single page.
//!
//! The page is rendered once with scripting disabled (what a non-rendering
//! crawler sees) and once with scripting enabled (what a visitor sees). The
//! ratio of visible text between the two is the page's SSR percentage.

use crate::error::Result;
use crate::renderer::{ContextOptions, RenderContext, Renderer, Viewport, WaitUntil};
use crate::result::{PageAnalysis, RenderCapture};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub viewport: Viewport,
    /// Extra wait after the network goes idle on the scripted pass.
    pub settle_delay: Duration,
    /// How long the network must stay quiet to count as idle.
    pub idle_quiet: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::MOBILE,
            settle_delay: Duration::from_secs(2),
            idle_quiet: Duration::from_millis(500),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

pub struct DualRenderAnalyzer {
    renderer: Arc<dyn Renderer>,
    config: AnalyzerConfig,
}

impl DualRenderAnalyzer {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::with_config(renderer, AnalyzerConfig::default())
    }

    pub fn with_config(renderer: Arc<dyn Renderer>, config: AnalyzerConfig) -> Self {
        Self { renderer, config }
    }

    /// Render `url` twice and compare the visible text. Any navigation or
    /// rendering failure is returned as-is; nothing is retried.
    pub async fn analyze(&self, url: &str) -> Result<PageAnalysis> {
        info!("Analyzing {}", url);

        let initial = self.capture(url, false).await?;
        let rendered = self.capture(url, true).await?;

        let raw = raw_ssr_ratio(initial.text_len(), rendered.text_len());
        if raw > 100.0 {
            info!(
                "{}: static render has more text than scripted render ({:.2}%), capped at 100",
                url, raw
            );
        }
        let ssr_percentage = ssr_percentage(initial.text_len(), rendered.text_len());
        debug!(
            "{}: {} chars without scripting, {} with, SSR {:.2}%",
            url,
            initial.text_len(),
            rendered.text_len(),
            ssr_percentage
        );

        Ok(PageAnalysis {
            url: url.to_string(),
            ssr_percentage,
            page_title: initial.title.clone(),
            initial,
            rendered,
        })
    }

    async fn capture(&self, url: &str, javascript_enabled: bool) -> Result<RenderCapture> {
        let options = ContextOptions {
            javascript_enabled,
            viewport: self.config.viewport,
        };
        let mut ctx = self.renderer.new_context(&options).await?;

        let outcome = self.capture_in(ctx.as_mut(), url, javascript_enabled).await;

        if let Err(e) = ctx.close().await {
            warn!("Failed to close render context for {}: {}", url, e);
        }
        outcome
    }

    async fn capture_in(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        javascript_enabled: bool,
    ) -> Result<RenderCapture> {
        if javascript_enabled {
            ctx.navigate(
                url,
                WaitUntil::NetworkIdle {
                    quiet: self.config.idle_quiet,
                },
            )
            .await?;
            if !self.config.settle_delay.is_zero() {
                tokio::time::sleep(self.config.settle_delay).await;
            }
            let html = ctx.content().await?;
            Ok(RenderCapture::new(url.to_string(), true, html, None))
        } else {
            ctx.navigate(url, WaitUntil::DomContentLoaded).await?;
            let html = ctx.content().await?;
            let title = ctx.title().await?;
            Ok(RenderCapture::new(url.to_string(), false, html, title))
        }
    }
}

/// `initial_len / rendered_len * 100` as computed, unrounded and uncapped.
/// Zero when the scripted render has no text at all.
pub fn raw_ssr_ratio(initial_len: usize, rendered_len: usize) -> f64 {
    if rendered_len == 0 {
        return 0.0;
    }
    initial_len as f64 / rendered_len as f64 * 100.0
}

/// [`raw_ssr_ratio`] rounded to two decimals and capped at 100.
pub fn ssr_percentage(initial_len: usize, rendered_len: usize) -> f64 {
    let raw = raw_ssr_ratio(initial_len, rendered_len);
    (raw.min(100.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::test_support::StubRenderer;

    fn analyzer(renderer: Arc<StubRenderer>) -> DualRenderAnalyzer {
        DualRenderAnalyzer::with_config(
            renderer,
            AnalyzerConfig::default().with_settle_delay(Duration::ZERO),
        )
    }

    #[test]
    fn test_ssr_percentage_rounds_to_two_decimals() {
        assert_eq!(ssr_percentage(1, 3), 33.33);
        assert_eq!(ssr_percentage(2, 3), 66.67);
        assert_eq!(ssr_percentage(50, 100), 50.0);
    }

    #[test]
    fn test_raw_ratio_is_not_capped() {
        assert_eq!(raw_ssr_ratio(150, 100), 150.0);
        assert_eq!(ssr_percentage(150, 100), 100.0);
        assert_eq!(raw_ssr_ratio(5, 0), 0.0);
    }

    #[test]
    fn test_ssr_percentage_zero_when_rendered_empty() {
        assert_eq!(ssr_percentage(0, 0), 0.0);
        assert_eq!(ssr_percentage(120, 0), 0.0);
    }

    #[test]
    fn test_ssr_percentage_bounds() {
        for rendered in 1..60 {
            for initial in 0..120 {
                let ratio = ssr_percentage(initial, rendered);
                assert!(ratio.is_finite());
                assert!((0.0..=100.0).contains(&ratio), "{initial}/{rendered} -> {ratio}");
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_compares_both_renders() {
        let renderer = Arc::new(
            StubRenderer::scripted(
                "<html><body><div id=\"root\"><h1>Hello</h1><p>world of products</p></div></body></html>",
            )
            .with_static(
                "<html><head><title>Shop</title></head><body><h1>Hello</h1><div id=\"root\"></div></body></html>",
                Some("Shop"),
            ),
        );

        let analysis = analyzer(renderer.clone())
            .analyze("https://example.com/")
            .await
            .unwrap();

        assert_eq!(analysis.initial.text, "Hello");
        assert_eq!(analysis.rendered.text, "Hello world of products");
        assert_eq!(analysis.ssr_percentage, 21.74);
        assert_eq!(analysis.page_title.as_deref(), Some("Shop"));
        assert!(analysis.rendered.title.is_none());
        assert_eq!(renderer.opened(), 2);
        assert_eq!(renderer.closed(), 2);
    }

    #[tokio::test]
    async fn test_analyze_empty_scripted_render_is_zero() {
        let renderer = Arc::new(
            StubRenderer::scripted("<html><body></body></html>")
                .with_static("<html><body></body></html>", None),
        );

        let analysis = analyzer(renderer).analyze("https://example.com/").await.unwrap();
        assert_eq!(analysis.ssr_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_analyze_surfaces_render_errors_and_closes_context() {
        let renderer = Arc::new(StubRenderer::failing());

        let result = analyzer(renderer.clone()).analyze("https://example.com/").await;

        assert!(matches!(result, Err(ScanError::Render(_))));
        assert_eq!(renderer.opened(), 1);
        assert_eq!(renderer.closed(), 1);
    }
}
