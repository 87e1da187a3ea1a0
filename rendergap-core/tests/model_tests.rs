// Tests for sites and result rows

use rendergap_core::model::{
    PageDepth, Site, SiteReport, SsrResult, SsrValue, normalize_site_url,
};
use rendergap_scanner::{PageAnalysis, RenderCapture};

fn analysis(url: &str, ssr: f64) -> PageAnalysis {
    PageAnalysis {
        url: url.to_string(),
        ssr_percentage: ssr,
        page_title: None,
        initial: RenderCapture::default(),
        rendered: RenderCapture::default(),
    }
}

#[test]
fn test_normalize_site_url() {
    assert_eq!(normalize_site_url("example.com"), "https://example.com");
    assert_eq!(normalize_site_url("  http://example.com  "), "http://example.com");
    assert_eq!(normalize_site_url("   "), "");
}

#[test]
fn test_site_homepage_drops_path_query_and_fragment() {
    let site = Site::parse("https://example.com/deep/page?q=1#top").unwrap();
    assert_eq!(site.base_url, "https://example.com/deep/page?q=1#top");
    assert_eq!(site.homepage.as_str(), "https://example.com/");
    assert_eq!(site.host(), "example.com");
}

#[test]
fn test_site_homepage_keeps_non_default_port() {
    let site = Site::parse("http://localhost:3000/app").unwrap();
    assert_eq!(site.homepage.as_str(), "http://localhost:3000/");

    let site = Site::parse("https://example.com:443/").unwrap();
    assert_eq!(site.homepage.as_str(), "https://example.com/");
}

#[test]
fn test_site_parse_rejects_garbage() {
    assert!(Site::parse("").is_err());
    assert!(Site::parse("https://").is_err());
    assert!(Site::parse("http://[::1").is_err());
}

#[test]
fn test_ssr_value_display_and_parse() {
    assert_eq!(SsrValue::Percentage(45.0).to_string(), "45.00");
    assert_eq!(SsrValue::Percentage(33.333).to_string(), "33.33");
    assert_eq!(SsrValue::NotApplicable.to_string(), "N/A");
    assert_eq!(SsrValue::Error.to_string(), "Error");

    assert_eq!("N/A".parse::<SsrValue>(), Ok(SsrValue::NotApplicable));
    assert_eq!("Error".parse::<SsrValue>(), Ok(SsrValue::Error));
    assert_eq!("12.50".parse::<SsrValue>(), Ok(SsrValue::Percentage(12.5)));
    assert!("twelve".parse::<SsrValue>().is_err());
    assert_eq!(SsrValue::Error.percentage(), None);
}

#[test]
fn test_page_depth_display() {
    assert_eq!(PageDepth::Homepage.to_string(), "Homepage");
    assert_eq!(PageDepth::NotApplicable.to_string(), "N/A");
}

#[test]
fn test_not_applicable_row() {
    let row = SsrResult::not_applicable("https://plain.test");
    assert_eq!(row.analyzed_url, "N/A");
    assert!(!row.framework_detected);
    assert_eq!(row.ssr, SsrValue::NotApplicable);
    assert_eq!(row.depth, PageDepth::NotApplicable);
}

#[test]
fn test_worst_page_replaced_only_by_strictly_lower() {
    let mut report = SiteReport::default();

    report.offer(PageDepth::Homepage, &analysis("https://a.test/", 40.0));
    report.offer(PageDepth::Mid, &analysis("https://a.test/mid", 40.0));
    assert_eq!(report.worst.as_ref().unwrap().depth, PageDepth::Homepage);

    report.offer(PageDepth::Deep, &analysis("https://a.test/deep", 10.0));
    let worst = report.worst.as_ref().unwrap();
    assert_eq!(worst.depth, PageDepth::Deep);
    assert_eq!(worst.unreadable_percentage(), 90.0);
}
