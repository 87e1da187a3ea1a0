use rendergap::commands::command_argument_builder;
use rendergap::handlers::*;
use rendergap_core::model::{PageDepth, SsrResult, SsrValue};
use rendergap_core::report::ReportFormat;
use std::path::PathBuf;
use std::time::Duration;

fn audit_args(argv: &[&str]) -> Result<AuditArgs, String> {
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .map_err(|e| e.to_string())?;
    let (_, sub) = matches.subcommand().expect("audit subcommand");
    AuditArgs::from_matches(sub)
}

#[test]
fn test_audit_defaults() {
    let args = audit_args(&["rendergap", "audit"]).unwrap();

    assert_eq!(args.input, PathBuf::from("sites.csv"));
    assert_eq!(args.output_dir, PathBuf::from("."));
    assert_eq!(args.format, ReportFormat::Html);
    assert_eq!(args.rate_limit, 30);
    assert_eq!(args.settle_delay, Duration::from_secs(2));
    assert!(args.chrome.is_none());
}

#[test]
fn test_audit_all_flags() {
    let args = audit_args(&[
        "rendergap",
        "-q",
        "audit",
        "-i",
        "targets.csv",
        "-o",
        "out",
        "-f",
        "md",
        "--rate-limit",
        "10",
        "--settle-ms",
        "500",
        "--chrome",
        "/usr/bin/chromium",
    ])
    .unwrap();

    assert_eq!(args.input, PathBuf::from("targets.csv"));
    assert_eq!(args.output_dir, PathBuf::from("out"));
    assert_eq!(args.format, ReportFormat::Markdown);
    assert_eq!(args.rate_limit, 10);
    assert_eq!(args.settle_delay, Duration::from_millis(500));
    assert_eq!(args.chrome, Some(PathBuf::from("/usr/bin/chromium")));
}

#[test]
fn test_audit_rejects_unknown_format() {
    assert!(audit_args(&["rendergap", "audit", "-f", "pdf"]).is_err());
}

#[test]
fn test_audit_rejects_zero_rate_limit() {
    let err = audit_args(&["rendergap", "audit", "--rate-limit", "0"]).unwrap_err();
    assert!(err.contains("rate-limit"));
}

#[test]
fn test_expand_path_without_tilde() {
    assert_eq!(expand_path("data/sites.csv"), PathBuf::from("data/sites.csv"));
}

#[test]
fn test_expand_path_with_tilde() {
    let expanded = expand_path("~/sites.csv");
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("sites.csv"));
}

#[test]
fn test_format_ssr_text() {
    colored::control::set_override(false);
    assert_eq!(format_ssr(&SsrValue::Percentage(95.5)).to_string(), "  95.50%");
    assert_eq!(format_ssr(&SsrValue::NotApplicable).to_string(), "     N/A");
    assert_eq!(format_ssr(&SsrValue::Error).to_string(), "   Error");
}

#[test]
fn test_summarize_counts_row_kinds() {
    let rows = vec![
        SsrResult::not_applicable("https://a.test"),
        SsrResult::site_error("https://b.test"),
        SsrResult {
            base_url: "https://c.test".to_string(),
            analyzed_url: "https://c.test/".to_string(),
            framework_detected: true,
            ssr: SsrValue::Percentage(12.0),
            depth: PageDepth::Homepage,
        },
        SsrResult::page_error("https://c.test", "https://c.test/blog", PageDepth::Mid),
    ];

    assert_eq!(summarize(&rows), (1, 1, 2));
    assert_eq!(summarize(&[]), (0, 0, 0));
}
