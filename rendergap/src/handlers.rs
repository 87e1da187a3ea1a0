use clap::ArgMatches;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use rendergap_core::audit::{AuditConfig, AuditProgressCallback, SiteAuditor, run_batch};
use rendergap_core::io::{CsvResultWriter, read_sites, results_filename, timestamp};
use rendergap_core::model::{SsrResult, SsrValue};
use rendergap_core::report::{FileReportSink, ReportFormat};
use rendergap_core::wordcloud::PngWordCloud;
use rendergap_scanner::{
    BrowserOptions, ChromiumRenderer, FetchConfig, Fetcher, Renderer, SlidingWindowLimiter,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Settings for one `audit` run, read from the command line.
#[derive(Debug, Clone)]
pub struct AuditArgs {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub format: ReportFormat,
    pub rate_limit: usize,
    pub settle_delay: Duration,
    pub chrome: Option<PathBuf>,
}

impl AuditArgs {
    pub fn from_matches(args: &ArgMatches) -> Result<Self, String> {
        let input = args
            .get_one::<String>("input")
            .map(|p| expand_path(p))
            .unwrap_or_else(|| PathBuf::from("sites.csv"));
        let output_dir = args
            .get_one::<String>("output-dir")
            .map(|p| expand_path(p))
            .unwrap_or_else(|| PathBuf::from("."));

        let format_name = args
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("html");
        let format = ReportFormat::from_str(format_name)
            .ok_or_else(|| format!("Unknown report format '{}'", format_name))?;

        let rate_limit = *args.get_one::<usize>("rate-limit").unwrap_or(&30);
        if rate_limit == 0 {
            return Err("--rate-limit must be at least 1".to_string());
        }
        let settle_ms = *args.get_one::<u64>("settle-ms").unwrap_or(&2000);

        Ok(Self {
            input,
            output_dir,
            format,
            rate_limit,
            settle_delay: Duration::from_millis(settle_ms),
            chrome: args.get_one::<PathBuf>("chrome").cloned(),
        })
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn print_banner() {
    println!();
    println!("{}", "  rendergap".bright_cyan().bold());
    println!(
        "{}",
        "  how much of your site can a crawler read without JavaScript?".bright_black()
    );
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// SSR cell colored by how readable the page is without scripts.
pub fn format_ssr(value: &SsrValue) -> ColoredString {
    match value {
        SsrValue::Percentage(p) if *p >= 80.0 => format!("{:>7.2}%", p).green(),
        SsrValue::Percentage(p) if *p >= 40.0 => format!("{:>7.2}%", p).yellow(),
        SsrValue::Percentage(p) => format!("{:>7.2}%", p).red().bold(),
        SsrValue::NotApplicable => format!("{:>8}", "N/A").bright_black(),
        SsrValue::Error => format!("{:>8}", "Error").red(),
    }
}

/// Counts of (analyzed pages, not applicable sites, error rows).
pub fn summarize(rows: &[SsrResult]) -> (usize, usize, usize) {
    rows.iter().fold((0, 0, 0), |(ok, na, err), row| match row.ssr {
        SsrValue::Percentage(_) => (ok + 1, na, err),
        SsrValue::NotApplicable => (ok, na + 1, err),
        SsrValue::Error => (ok, na, err + 1),
    })
}

fn print_results(rows: &[SsrResult]) {
    let mut current_site: Option<&str> = None;
    for row in rows {
        if current_site != Some(row.base_url.as_str()) {
            println!();
            println!("  {}", row.base_url.bright_white().bold());
            current_site = Some(row.base_url.as_str());
        }
        println!(
            "    {} {:<9} {}",
            format_ssr(&row.ssr),
            row.depth.to_string().cyan(),
            row.analyzed_url
        );
    }
    println!();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

pub async fn handle_audit(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    if quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let args = AuditArgs::from_matches(sub_matches).unwrap_or_else(|e| fail(e));

    let sites = match read_sites(&args.input) {
        Ok(sites) if sites.is_empty() => fail(format!("No sites found in {}", args.input.display())),
        Ok(sites) => sites,
        Err(e) => fail(format!("Failed to read {}: {}", args.input.display(), e)),
    };

    if let Err(e) = fs::create_dir_all(&args.output_dir) {
        fail(format!(
            "Failed to create output directory {}: {}",
            args.output_dir.display(),
            e
        ));
    }

    if !quiet {
        print_divider();
        println!("{}", "  SSR AUDIT".bright_white().bold());
        print_divider();
        println!("{} Sites: {}", "→".blue(), sites.len().to_string().cyan());
        println!(
            "{} Rate limit: {} requests/minute",
            "→".blue(),
            args.rate_limit.to_string().cyan()
        );
        println!(
            "{} Report format: {}",
            "→".blue(),
            args.format.extension().cyan()
        );
        println!();
    }

    let browser_options = BrowserOptions {
        executable: args.chrome.clone(),
        ..BrowserOptions::default()
    };
    let browser = match ChromiumRenderer::launch(browser_options).await {
        Ok(browser) => Arc::new(browser),
        Err(e) => fail(format!("Could not start Chromium: {}", e)),
    };
    let renderer: Arc<dyn Renderer> = browser.clone();

    let limiter = Arc::new(SlidingWindowLimiter::per_minute(args.rate_limit));
    let fetcher = Fetcher::with_config(limiter, FetchConfig::default())
        .unwrap_or_else(|e| fail(format!("Could not build HTTP client: {}", e)));

    let config = AuditConfig::default().with_settle_delay(args.settle_delay);
    let auditor = SiteAuditor::new(fetcher, renderer, config);

    let ts = timestamp();
    let results_path = args.output_dir.join(results_filename(&ts));
    let mut results = CsvResultWriter::create(&results_path)
        .unwrap_or_else(|e| fail(format!("Cannot write {}: {}", results_path.display(), e)));
    let mut reports = FileReportSink::new(
        &args.output_dir,
        args.format,
        ts,
        Box::new(PngWordCloud::default()),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting audit...");

    let spinner_clone = spinner.clone();
    let progress_callback: AuditProgressCallback = Arc::new(move |msg: String| {
        spinner_clone.set_message(msg);
    });

    let outcome = run_batch(
        &sites,
        &auditor,
        &mut results,
        &mut reports,
        Some(progress_callback),
    )
    .await;
    spinner.finish_and_clear();

    drop(auditor);
    match Arc::try_unwrap(browser) {
        Ok(browser) => {
            if let Err(e) = browser.shutdown().await {
                tracing::warn!("Chromium did not shut down cleanly: {}", e);
            }
        }
        Err(_) => tracing::warn!("Chromium still in use, leaving it to exit with the process"),
    }

    let summary = outcome.unwrap_or_else(|e| fail(format!("Audit aborted: {}", e)));

    println!("{} Audit complete!", "✓".green().bold());
    if !quiet {
        print_results(&summary.rows);
    }

    let (analyzed, not_applicable, errors) = summarize(&summary.rows);
    println!(
        "{} {} pages analyzed, {} sites without a React front end, {} errors",
        "ℹ".blue(),
        analyzed.to_string().cyan(),
        not_applicable.to_string().cyan(),
        errors.to_string().cyan()
    );
    println!(
        "{} Results: {}",
        "✓".green().bold(),
        results.path().display().to_string().bright_white()
    );
    for path in reports.written() {
        println!(
            "{} Report: {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
}
