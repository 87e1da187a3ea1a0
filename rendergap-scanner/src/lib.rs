pub mod analyzer;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod renderer;
pub mod result;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyzer::{AnalyzerConfig, DualRenderAnalyzer, raw_ssr_ratio, ssr_percentage};
pub use detector::{FrameworkDetector, RenderedPage, Signal};
pub use discovery::{Discovered, DiscoveryStrategy, LinkDiscovery};
pub use error::ScanError;
pub use fetcher::{FetchConfig, Fetcher, NoopLimiter, RateLimit, SlidingWindowLimiter};
pub use renderer::{
    BrowserOptions, ChromiumRenderer, ContextOptions, RenderContext, Renderer, Viewport, WaitUntil,
};
pub use result::{PageAnalysis, RenderCapture};
