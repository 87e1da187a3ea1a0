//! Best-effort detection of React-family front ends.
//!
//! Detection runs an ordered list of [`Signal`]s against one scripted
//! rendering of a page. The first signal that matches decides; a page on
//! which nothing matches is treated as not built with React.

use crate::error::Result;
use crate::renderer::RenderContext;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

static INLINE_SCRIPTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());
static BUNDLE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"react(-dom)?(\.production|\.development)?(\.min)?\.js").unwrap()
});
static EMBEDDED_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Z][A-Za-z0-9]*[\s/>]").unwrap());

const API_CALL_SITES: [&str; 6] = [
    "React.createElement",
    "ReactDOM.render",
    "ReactDOM.createRoot",
    "ReactDOM.hydrate",
    "hydrateRoot(",
    "createRoot(",
];

/// A fully rendered page as the signals see it: the live context plus a
/// snapshot of its serialized markup.
pub struct RenderedPage<'a> {
    context: &'a dyn RenderContext,
    html: String,
}

impl<'a> RenderedPage<'a> {
    pub async fn capture(context: &'a dyn RenderContext) -> Result<Self> {
        let html = context.content().await?;
        Ok(Self::new(context, html))
    }

    pub fn new(context: &'a dyn RenderContext, html: String) -> Self {
        Self { context, html }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn has(&self, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        Html::parse_document(&self.html)
            .select(&selector)
            .next()
            .is_some()
    }

    pub fn inline_scripts(&self) -> Vec<String> {
        Html::parse_document(&self.html)
            .select(&INLINE_SCRIPTS)
            .map(|script| script.text().collect::<String>())
            .collect()
    }

    /// Evaluate a boolean JavaScript expression in the live page.
    pub async fn eval_bool(&self, script: &str) -> Result<bool> {
        let value = self.context.execute_js(script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

/// One independent pass/fail probe.
#[async_trait]
pub trait Signal: Send + Sync {
    fn name(&self) -> &'static str;

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool>;
}

/// A JavaScript expression evaluated against the live runtime.
pub struct ScriptProbe {
    name: &'static str,
    script: &'static str,
}

#[async_trait]
impl Signal for ScriptProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool> {
        page.eval_bool(self.script).await
    }
}

/// A CSS selector matched against the live markup.
pub struct SelectorProbe {
    name: &'static str,
    selector: &'static str,
}

#[async_trait]
impl Signal for SelectorProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool> {
        Ok(page.has(self.selector))
    }
}

pub const GLOBAL_RUNTIME_JS: &str = "typeof window.React !== 'undefined'";
pub const ROOT_CONTAINER_JS: &str =
    "Array.from(document.querySelectorAll('*')).some(el => el._reactRootContainer !== undefined)";
pub const INTERNAL_KEY_JS: &str = "Array.from(document.querySelectorAll('*'))\
    .some(el => Object.keys(el).some(key => key.startsWith('__react')))";

/// Bundled React script names anywhere in the markup.
pub struct BundleFilename;

#[async_trait]
impl Signal for BundleFilename {
    fn name(&self) -> &'static str {
        "bundle filename"
    }

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool> {
        Ok(BUNDLE_FILENAME.is_match(page.html()))
    }
}

/// React API calls inside inline scripts.
pub struct ApiCallSite;

#[async_trait]
impl Signal for ApiCallSite {
    fn name(&self) -> &'static str {
        "API call site"
    }

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool> {
        Ok(page
            .inline_scripts()
            .iter()
            .any(|script| API_CALL_SITES.iter().any(|call| script.contains(call))))
    }
}

/// JSX-like capitalized tags in inline scripts, or React's text placeholder
/// comments in the markup.
pub struct EmbeddedMarkup;

#[async_trait]
impl Signal for EmbeddedMarkup {
    fn name(&self) -> &'static str {
        "embedded markup"
    }

    async fn matches(&self, page: &RenderedPage<'_>) -> Result<bool> {
        if page.html().contains("<!-- react-text") {
            return Ok(true);
        }
        Ok(page
            .inline_scripts()
            .iter()
            .any(|script| EMBEDDED_MARKUP.is_match(script)))
    }
}

/// The default signal set, in priority order.
pub fn react_signals() -> Vec<Box<dyn Signal>> {
    vec![
        Box::new(ScriptProbe {
            name: "global runtime",
            script: GLOBAL_RUNTIME_JS,
        }),
        Box::new(SelectorProbe {
            name: "marker attribute",
            selector: "[data-reactroot]",
        }),
        Box::new(ScriptProbe {
            name: "root container",
            script: ROOT_CONTAINER_JS,
        }),
        Box::new(ScriptProbe {
            name: "internal key prefix",
            script: INTERNAL_KEY_JS,
        }),
        Box::new(BundleFilename),
        Box::new(ApiCallSite),
        Box::new(EmbeddedMarkup),
        Box::new(SelectorProbe {
            name: "Next.js data island",
            selector: "script#__NEXT_DATA__",
        }),
        Box::new(SelectorProbe {
            name: "Gatsby root",
            selector: "#___gatsby",
        }),
    ]
}

pub struct FrameworkDetector {
    signals: Vec<Box<dyn Signal>>,
}

impl FrameworkDetector {
    pub fn new() -> Self {
        Self::with_signals(react_signals())
    }

    pub fn with_signals(signals: Vec<Box<dyn Signal>>) -> Self {
        Self { signals }
    }

    /// True as soon as one signal matches.
    pub async fn detect(&self, page: &RenderedPage<'_>) -> bool {
        self.first_match(page).await.is_some()
    }

    /// Name of the first matching signal. A probe that errors counts as a
    /// miss so one broken probe cannot hide the others.
    pub async fn first_match(&self, page: &RenderedPage<'_>) -> Option<&'static str> {
        for signal in &self.signals {
            match signal.matches(page).await {
                Ok(true) => {
                    debug!("Framework signal matched: {}", signal.name());
                    return Some(signal.name());
                }
                Ok(false) => {}
                Err(e) => warn!("Framework signal {} failed: {}", signal.name(), e),
            }
        }
        None
    }
}

impl Default for FrameworkDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::renderer::{ContextOptions, Renderer};
    use crate::test_support::StubRenderer;
    use serde_json::Value;

    async fn first_match_for(renderer: StubRenderer) -> Option<&'static str> {
        let ctx = renderer
            .new_context(&ContextOptions::scripted())
            .await
            .unwrap();
        let page = RenderedPage::capture(ctx.as_ref()).await.unwrap();
        FrameworkDetector::new().first_match(&page).await
    }

    #[tokio::test]
    async fn test_plain_page_is_not_detected() {
        let renderer = StubRenderer::scripted(
            r#"<html><body><h1>Static site</h1><script>console.log("hi")</script></body></html>"#,
        );
        assert_eq!(first_match_for(renderer).await, None);
    }

    #[tokio::test]
    async fn test_global_runtime() {
        let renderer = StubRenderer::scripted("<body></body>")
            .with_script(GLOBAL_RUNTIME_JS, Value::Bool(true));
        assert_eq!(first_match_for(renderer).await, Some("global runtime"));
    }

    #[tokio::test]
    async fn test_marker_attribute() {
        let renderer =
            StubRenderer::scripted(r#"<body><div data-reactroot=""><p>x</p></div></body>"#);
        assert_eq!(first_match_for(renderer).await, Some("marker attribute"));
    }

    #[tokio::test]
    async fn test_root_container() {
        let renderer = StubRenderer::scripted("<body><div id=\"root\"></div></body>")
            .with_script(ROOT_CONTAINER_JS, Value::Bool(true));
        assert_eq!(first_match_for(renderer).await, Some("root container"));
    }

    #[tokio::test]
    async fn test_internal_key_prefix() {
        let renderer = StubRenderer::scripted("<body><div id=\"root\"></div></body>")
            .with_script(INTERNAL_KEY_JS, Value::Bool(true));
        assert_eq!(first_match_for(renderer).await, Some("internal key prefix"));
    }

    #[tokio::test]
    async fn test_bundle_filename() {
        let renderer = StubRenderer::scripted(
            r#"<html><head><script src="/vendor/react-dom.production.min.js"></script></head><body></body></html>"#,
        );
        assert_eq!(first_match_for(renderer).await, Some("bundle filename"));
    }

    #[tokio::test]
    async fn test_api_call_site() {
        let renderer = StubRenderer::scripted(
            r#"<body><script>ReactDOM.createRoot(document.getElementById("app"))</script></body>"#,
        );
        assert_eq!(first_match_for(renderer).await, Some("API call site"));
    }

    #[tokio::test]
    async fn test_embedded_markup_in_script() {
        let renderer = StubRenderer::scripted(
            r#"<body><script>const view = () => (<App title="x" />);</script></body>"#,
        );
        assert_eq!(first_match_for(renderer).await, Some("embedded markup"));
    }

    #[tokio::test]
    async fn test_embedded_markup_placeholder_comment() {
        let renderer = StubRenderer::scripted(
            "<body><span><!-- react-text: 5 -->Hello<!-- /react-text --></span></body>",
        );
        assert_eq!(first_match_for(renderer).await, Some("embedded markup"));
    }

    #[tokio::test]
    async fn test_next_data_island() {
        let renderer = StubRenderer::scripted(
            r#"<body><div id="__next"></div><script id="__NEXT_DATA__" type="application/json">{"page":"/"}</script></body>"#,
        );
        assert_eq!(first_match_for(renderer).await, Some("Next.js data island"));
    }

    #[tokio::test]
    async fn test_gatsby_root() {
        let renderer = StubRenderer::scripted(r#"<body><div id="___gatsby"></div></body>"#);
        assert_eq!(first_match_for(renderer).await, Some("Gatsby root"));
    }

    #[tokio::test]
    async fn test_priority_order_prefers_earlier_signal() {
        let renderer = StubRenderer::scripted(r#"<body><div id="___gatsby" data-reactroot=""></div></body>"#)
            .with_script(GLOBAL_RUNTIME_JS, Value::Bool(true));
        assert_eq!(first_match_for(renderer).await, Some("global runtime"));
    }

    struct Broken;

    #[async_trait]
    impl Signal for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn matches(&self, _page: &RenderedPage<'_>) -> Result<bool> {
            Err(ScanError::Render("execution context was destroyed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_signal_does_not_stop_detection() {
        let renderer = StubRenderer::scripted(r#"<body><div id="___gatsby"></div></body>"#);
        let ctx = renderer
            .new_context(&ContextOptions::scripted())
            .await
            .unwrap();
        let page = RenderedPage::capture(ctx.as_ref()).await.unwrap();

        let detector = FrameworkDetector::with_signals(vec![
            Box::new(Broken),
            Box::new(SelectorProbe {
                name: "Gatsby root",
                selector: "#___gatsby",
            }),
        ]);
        assert!(detector.detect(&page).await);

        let only_broken = FrameworkDetector::with_signals(vec![Box::new(Broken)]);
        assert!(!only_broken.detect(&page).await);
    }
}
