//! Internal link discovery.
//!
//! A site's pages are found by trying an ordered list of strategies:
//! the XML sitemap, two conventional HTML sitemap pages, and finally the
//! live DOM of the rendered homepage. The first strategy that produces at
//! least one link wins; failures are logged and skipped.

use crate::error::{Result, ScanError};
use crate::extract::root_relative_links;
use crate::fetcher::Fetcher;
use crate::renderer::{Renderer, render_live_html};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// One way of finding a site's internal pages.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Absolute URLs of internal pages, in source order.
    async fn try_discover(&self, homepage: &Url) -> Result<Vec<String>>;
}

/// `/sitemap.xml` in the standard sitemap schema.
pub struct SitemapXml {
    fetcher: Fetcher,
}

impl SitemapXml {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl DiscoveryStrategy for SitemapXml {
    fn name(&self) -> &'static str {
        "sitemap.xml"
    }

    async fn try_discover(&self, homepage: &Url) -> Result<Vec<String>> {
        let url = join(homepage, "/sitemap.xml")?;
        let response = self.fetcher.fetch(url.as_str()).await?;
        let urls = parse_sitemap(&response.body)?;
        if urls.is_empty() {
            return Err(ScanError::EmptyResult(format!("{} lists no URLs", url)));
        }
        Ok(urls)
    }
}

/// An ad hoc HTML page listing the site, e.g. `/sitemap` or `/site-map`.
pub struct HtmlSitemap {
    fetcher: Fetcher,
    path: &'static str,
}

impl HtmlSitemap {
    pub fn new(fetcher: Fetcher, path: &'static str) -> Self {
        Self { fetcher, path }
    }
}

#[async_trait]
impl DiscoveryStrategy for HtmlSitemap {
    fn name(&self) -> &'static str {
        self.path
    }

    async fn try_discover(&self, homepage: &Url) -> Result<Vec<String>> {
        let url = join(homepage, self.path)?;
        let response = self.fetcher.fetch(url.as_str()).await?;
        Ok(root_relative_links(&response.body, homepage))
    }
}

/// Anchors from the homepage after client-side scripts have run.
pub struct RenderedHomepage {
    renderer: Arc<dyn Renderer>,
}

impl RenderedHomepage {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl DiscoveryStrategy for RenderedHomepage {
    fn name(&self) -> &'static str {
        "rendered homepage"
    }

    async fn try_discover(&self, homepage: &Url) -> Result<Vec<String>> {
        let html = render_live_html(self.renderer.as_ref(), homepage.as_str()).await?;
        Ok(root_relative_links(&html, homepage))
    }
}

/// Links found by one discovery run and the strategies it tried to get them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovered {
    pub links: Vec<String>,
    pub attempted: Vec<&'static str>,
}

impl Discovered {
    pub fn tried(&self, strategy: &str) -> bool {
        self.attempted.iter().any(|name| *name == strategy)
    }
}

pub struct LinkDiscovery {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl LinkDiscovery {
    /// The standard chain: sitemap.xml, /sitemap, /site-map, rendered homepage.
    pub fn standard(fetcher: Fetcher, renderer: Arc<dyn Renderer>) -> Self {
        Self::with_strategies(vec![
            Box::new(SitemapXml::new(fetcher.clone())),
            Box::new(HtmlSitemap::new(fetcher.clone(), "/sitemap")),
            Box::new(HtmlSitemap::new(fetcher, "/site-map")),
            Box::new(RenderedHomepage::new(renderer)),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// Links from the first strategy that yields any, or an empty list when
    /// every strategy fails.
    pub async fn discover(&self, homepage: &Url) -> Vec<String> {
        self.discover_traced(homepage).await.links
    }

    /// Like [`discover`](Self::discover), also naming every strategy that ran.
    pub async fn discover_traced(&self, homepage: &Url) -> Discovered {
        let mut attempted = Vec::new();
        for strategy in &self.strategies {
            debug!("Trying {} on {}", strategy.name(), homepage);
            attempted.push(strategy.name());
            match strategy.try_discover(homepage).await {
                Ok(links) if !links.is_empty() => {
                    info!(
                        "Discovered {} links on {} via {}",
                        links.len(),
                        homepage,
                        strategy.name()
                    );
                    return Discovered {
                        links: dedupe(links),
                        attempted,
                    };
                }
                Ok(_) => warn!("{} found no links on {}", strategy.name(), homepage),
                Err(e) => warn!("{} failed for {}: {}", strategy.name(), homepage, e),
            }
        }

        warn!("No internal links discovered for {}", homepage);
        Discovered {
            links: Vec::new(),
            attempted,
        }
    }
}

/// Extract every `<url><loc>` from a sitemap document.
///
/// `<sitemap>` entries of a sitemap index are not followed.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut saw_element = false;
    let mut in_url = false;
    let mut in_loc = false;
    let mut current_loc = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_element = true;
                match e.local_name().as_ref() {
                    b"url" => {
                        in_url = true;
                        current_loc.clear();
                    }
                    b"loc" if in_url => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(_)) => saw_element = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" if in_url => {
                    let loc = current_loc.trim();
                    if !loc.is_empty() {
                        urls.push(loc.to_string());
                    }
                    in_url = false;
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|e| ScanError::Parse(format!("bad sitemap text: {e}")))?;
                current_loc.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current_loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScanError::Parse(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if !saw_element {
        return Err(ScanError::Parse("document has no XML elements".to_string()));
    }
    Ok(urls)
}

fn join(homepage: &Url, path: &str) -> Result<Url> {
    homepage
        .join(path)
        .map_err(|e| ScanError::InvalidUrl(format!("{homepage}{path}: {e}")))
}

fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
