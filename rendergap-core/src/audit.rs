//! Per-site audit state machine and the sequential batch runner.

use crate::error::Result;
use crate::model::{PageDepth, Site, SiteReport, SsrResult};
use crate::report::ReportInput;
use crate::selector::{PageSelection, select};
use async_trait::async_trait;
use rendergap_scanner::discovery::{DiscoveryStrategy, RenderedHomepage};
use rendergap_scanner::{
    AnalyzerConfig, ContextOptions, DualRenderAnalyzer, Fetcher, FrameworkDetector,
    LinkDiscovery, PageAnalysis, RenderedPage, Renderer, ScanError, WaitUntil,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Callback for reporting batch progress
pub type AuditProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub analyzer: AnalyzerConfig,
    /// Below this many discovered links the rendered homepage is scraped too.
    pub min_links: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            min_links: 3,
        }
    }
}

impl AuditConfig {
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.analyzer = self.analyzer.with_settle_delay(settle_delay);
        self
    }
}

enum AuditState {
    Start,
    DetectFramework,
    Skip,
    DiscoverLinks,
    SelectPages(Vec<String>),
    AnalyzePages(PageSelection),
    PickWorst(Vec<(PageDepth, PageAnalysis)>),
    Done,
}

/// Something that turns a site into result rows. Never fails: errors become
/// rows.
#[async_trait]
pub trait Auditor: Send + Sync {
    async fn audit(&self, site: &Site) -> SiteReport;
}

pub struct SiteAuditor {
    renderer: Arc<dyn Renderer>,
    detector: FrameworkDetector,
    discovery: LinkDiscovery,
    fallback: Box<dyn DiscoveryStrategy>,
    analyzer: DualRenderAnalyzer,
    min_links: usize,
}

impl SiteAuditor {
    pub fn new(fetcher: Fetcher, renderer: Arc<dyn Renderer>, config: AuditConfig) -> Self {
        Self {
            detector: FrameworkDetector::new(),
            discovery: LinkDiscovery::standard(fetcher, renderer.clone()),
            fallback: Box::new(RenderedHomepage::new(renderer.clone())),
            analyzer: DualRenderAnalyzer::with_config(renderer.clone(), config.analyzer),
            min_links: config.min_links,
            renderer,
        }
    }

    pub fn with_detector(mut self, detector: FrameworkDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_discovery(mut self, discovery: LinkDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_fallback(mut self, fallback: Box<dyn DiscoveryStrategy>) -> Self {
        self.fallback = fallback;
        self
    }

    async fn run(&self, site: &Site, report: &mut SiteReport) -> Result<()> {
        let mut state = AuditState::Start;

        loop {
            debug!("{}: {:?}", site.base_url, StateName(&state));
            state = match state {
                AuditState::Start => AuditState::DetectFramework,

                AuditState::DetectFramework => {
                    if self.detect_framework(site).await? {
                        AuditState::DiscoverLinks
                    } else {
                        AuditState::Skip
                    }
                }

                AuditState::Skip => {
                    info!("No React-family framework on {}, skipping", site.base_url);
                    report.rows.push(SsrResult::not_applicable(&site.base_url));
                    AuditState::Done
                }

                AuditState::DiscoverLinks => {
                    AuditState::SelectPages(self.discover_links(site).await?)
                }

                AuditState::SelectPages(links) => AuditState::AnalyzePages(select(&links)),

                AuditState::AnalyzePages(selection) => {
                    AuditState::PickWorst(self.analyze_pages(site, &selection, report).await)
                }

                AuditState::PickWorst(analyses) => {
                    for (depth, analysis) in &analyses {
                        report.offer(*depth, analysis);
                    }
                    AuditState::Done
                }

                AuditState::Done => return Ok(()),
            };
        }
    }

    async fn detect_framework(&self, site: &Site) -> Result<bool> {
        let mut ctx = self.renderer.new_context(&ContextOptions::scripted()).await?;

        let outcome = match ctx.navigate(site.homepage.as_str(), WaitUntil::network_idle()).await {
            Ok(()) => match RenderedPage::capture(ctx.as_ref()).await {
                Ok(page) => Ok(self.detector.detect(&page).await),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = ctx.close().await {
            warn!("Failed to close render context for {}: {}", site.homepage, e);
        }
        outcome.map_err(Into::into)
    }

    async fn discover_links(&self, site: &Site) -> Result<Vec<String>> {
        let found = self.discovery.discover_traced(&site.homepage).await;
        let mut links = found.links.clone();

        if links.len() < self.min_links && found.tried(self.fallback.name()) {
            debug!(
                "Only {} links for {}, {} already ran",
                links.len(),
                site.base_url,
                self.fallback.name()
            );
        } else if links.len() < self.min_links {
            debug!(
                "Only {} links for {}, scraping the rendered homepage",
                links.len(),
                site.base_url
            );
            match self.fallback.try_discover(&site.homepage).await {
                Ok(scraped) => {
                    let scraped = dedupe(scraped);
                    if scraped.len() > links.len() {
                        links = scraped;
                    }
                }
                Err(e) => warn!("Homepage link scrape failed for {}: {}", site.base_url, e),
            }
        }

        if links.is_empty() {
            return Err(ScanError::EmptyResult(format!(
                "no internal links found for {}",
                site.base_url
            ))
            .into());
        }
        Ok(links)
    }

    /// Analyze the selected pages in order. The first failure adds an error
    /// row for that page and ends the run; earlier rows are kept.
    async fn analyze_pages(
        &self,
        site: &Site,
        selection: &PageSelection,
        report: &mut SiteReport,
    ) -> Vec<(PageDepth, PageAnalysis)> {
        let mut analyses = Vec::new();

        for (depth, url) in selection.pages() {
            match self.analyzer.analyze(url).await {
                Ok(analysis) => {
                    info!("{} ({}): {:.2}% SSR", url, depth, analysis.ssr_percentage);
                    report
                        .rows
                        .push(SsrResult::analyzed(&site.base_url, &analysis, depth));
                    analyses.push((depth, analysis));
                }
                Err(e) => {
                    warn!("Analysis of {} failed: {}", url, e);
                    report
                        .rows
                        .push(SsrResult::page_error(&site.base_url, url, depth));
                    break;
                }
            }
        }

        analyses
    }
}

#[async_trait]
impl Auditor for SiteAuditor {
    async fn audit(&self, site: &Site) -> SiteReport {
        let mut report = SiteReport::default();
        if let Err(e) = self.run(site, &mut report).await {
            warn!("Audit of {} failed: {}", site.base_url, e);
            report = SiteReport {
                rows: vec![SsrResult::site_error(&site.base_url)],
                worst: None,
            };
        }
        report
    }
}

struct StateName<'a>(&'a AuditState);

impl std::fmt::Debug for StateName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            AuditState::Start => "Start",
            AuditState::DetectFramework => "DetectFramework",
            AuditState::Skip => "Skip",
            AuditState::DiscoverLinks => "DiscoverLinks",
            AuditState::SelectPages(_) => "SelectPages",
            AuditState::AnalyzePages(_) => "AnalyzePages",
            AuditState::PickWorst(_) => "PickWorst",
            AuditState::Done => "Done",
        };
        f.write_str(name)
    }
}

fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links.into_iter().filter(|l| seen.insert(l.clone())).collect()
}

/// Receives result rows as each site finishes.
pub trait ResultSink {
    fn write_rows(&mut self, rows: &[SsrResult]) -> Result<()>;

    /// Called once after the last site with every row of the batch.
    fn finish(&mut self, rows: &[SsrResult]) -> Result<()> {
        let _ = rows;
        Ok(())
    }
}

/// Receives the report inputs of each site's worst page.
pub trait ReportSink {
    fn write_report(&mut self, input: &ReportInput) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub rows: Vec<SsrResult>,
    pub reports: usize,
}

/// Audit `sites` one at a time, in order. Row sink failures abort the batch;
/// a report that cannot be written is logged and skipped.
pub async fn run_batch(
    sites: &[Site],
    auditor: &dyn Auditor,
    results: &mut dyn ResultSink,
    reports: &mut dyn ReportSink,
    progress_callback: Option<AuditProgressCallback>,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for (idx, site) in sites.iter().enumerate() {
        if let Some(ref cb) = progress_callback {
            cb(format!("[{}/{}] Auditing {}", idx + 1, sites.len(), site.base_url));
        }

        let site_report = auditor.audit(site).await;
        results.write_rows(&site_report.rows)?;

        if let Some(ref worst) = site_report.worst {
            let input = ReportInput::from_worst(&site.base_url, worst);
            match reports.write_report(&input) {
                Ok(()) => summary.reports += 1,
                Err(e) => warn!("Could not write report for {}: {}", site.base_url, e),
            }
        }

        summary.rows.extend(site_report.rows);
    }

    results.finish(&summary.rows)?;
    Ok(summary)
}
