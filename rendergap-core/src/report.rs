// Report generation for a site's worst page

use crate::audit::ReportSink;
use crate::diff::{WordEntry, diff_words, hidden_share};
use crate::error::Result;
use crate::model::{PageDepth, WorstPage};
use crate::wordcloud::{CloudWord, WordCloudRenderer};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

/// How many words the text and markdown reports list per table.
const TOP_WORDS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "html" => Some(ReportFormat::Html),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportInput {
    pub base_url: String,
    pub analyzed_url: String,
    pub depth: PageDepth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    /// `100 - SSR percentage` of the analyzed page.
    pub unreadable_percentage: f64,
    pub entries: Vec<WordEntry>,
}

impl ReportInput {
    pub fn from_worst(base_url: &str, worst: &WorstPage) -> Self {
        let analysis = &worst.analysis;
        Self {
            base_url: base_url.to_string(),
            analyzed_url: analysis.url.clone(),
            depth: worst.depth,
            page_title: analysis.page_title.clone(),
            unreadable_percentage: worst.unreadable_percentage(),
            entries: diff_words(&analysis.rendered.text, &analysis.initial.text),
        }
    }

    pub fn cloud_words(&self) -> Vec<CloudWord> {
        self.entries.iter().map(CloudWord::from).collect()
    }

    fn title(&self) -> &str {
        self.page_title.as_deref().unwrap_or("(untitled)")
    }

    fn hidden_words(&self) -> impl Iterator<Item = &WordEntry> {
        self.entries.iter().filter(|e| !e.visible_to_no_script)
    }

    fn visible_words(&self) -> impl Iterator<Item = &WordEntry> {
        self.entries.iter().filter(|e| e.visible_to_no_script)
    }
}

pub fn generate_text_report(input: &ReportInput) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                     RENDERGAP CONTENT VISIBILITY REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Site:         {}\n", input.base_url));
    report.push_str(&format!("Page:         {}\n", input.analyzed_url));
    report.push_str(&format!("Page Depth:   {}\n", input.depth));
    report.push_str(&format!("Title:        {}\n", input.title()));
    report.push('\n');

    report.push_str(RULE);
    report.push_str("SUMMARY\n");
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!(
        "{:.2}% of this page's text is not readable without JavaScript.\n",
        input.unreadable_percentage
    ));
    report.push_str(&format!(
        "{:.1}% of word occurrences only appear after scripts run.\n\n",
        hidden_share(&input.entries) * 100.0
    ));

    report.push_str(RULE);
    report.push_str("WORDS HIDDEN FROM NON-RENDERING CRAWLERS\n");
    report.push_str(RULE);
    report.push('\n');
    push_word_lines(&mut report, input.hidden_words());

    report.push_str(RULE);
    report.push_str("WORDS VISIBLE TO ALL CRAWLERS\n");
    report.push_str(RULE);
    report.push('\n');
    push_word_lines(&mut report, input.visible_words());

    report.push_str(RULE);
    report.push_str("                          End of Report\n");
    report.push_str(RULE);
    report.push_str("\nGenerated by rendergap\n\n");

    report
}

fn push_word_lines<'a>(report: &mut String, words: impl Iterator<Item = &'a WordEntry>) {
    let mut any = false;
    for entry in words.take(TOP_WORDS) {
        report.push_str(&format!("  {:<16} {:>5}\n", entry.word, entry.weight));
        any = true;
    }
    if !any {
        report.push_str("  (none)\n");
    }
    report.push('\n');
}

pub fn generate_markdown_report(input: &ReportInput) -> String {
    let mut report = String::new();

    report.push_str(&format!("# Content visibility report: {}\n\n", input.base_url));
    report.push_str(&format!("- **Page:** {}\n", input.analyzed_url));
    report.push_str(&format!("- **Page depth:** {}\n", input.depth));
    report.push_str(&format!("- **Title:** {}\n", input.title()));
    report.push_str(&format!(
        "- **Unreadable without JavaScript:** {:.2}%\n",
        input.unreadable_percentage
    ));
    report.push_str(&format!(
        "- **Hidden word share:** {:.1}%\n\n",
        hidden_share(&input.entries) * 100.0
    ));

    report.push_str("## Hidden from non-rendering crawlers\n\n");
    push_word_table(&mut report, input.hidden_words());

    report.push_str("## Visible to all crawlers\n\n");
    push_word_table(&mut report, input.visible_words());

    report
}

fn push_word_table<'a>(report: &mut String, words: impl Iterator<Item = &'a WordEntry>) {
    let rows: Vec<&WordEntry> = words.take(TOP_WORDS).collect();
    if rows.is_empty() {
        report.push_str("_None._\n\n");
        return;
    }
    report.push_str("| Word | Count |\n|------|------:|\n");
    for entry in rows {
        report.push_str(&format!("| {} | {} |\n", entry.word, entry.weight));
    }
    report.push('\n');
}

pub fn generate_json_report(input: &ReportInput) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "rendergap",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "site": input.base_url,
            "page": {
                "url": input.analyzed_url,
                "depth": input.depth,
                "title": input.page_title,
            },
            "summary": {
                "unreadable_percentage": input.unreadable_percentage,
                "hidden_share": hidden_share(&input.entries),
                "distinct_words": input.entries.len(),
            },
            "words": input.entries,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Standalone HTML page with the word cloud inlined as a data URI.
pub fn generate_html_report(input: &ReportInput, cloud: &dyn WordCloudRenderer) -> Result<String> {
    let image = cloud.render(&input.cloud_words())?;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Content visibility report: {}</title>\n",
        escape_html(&input.base_url)
    ));
    html.push_str(
        "<style>\n\
         body { font-family: sans-serif; max-width: 860px; margin: 2em auto; color: #222; }\n\
         .gap { font-size: 2.5em; font-weight: bold; color: #c62828; }\n\
         .legend span { display: inline-block; margin-right: 1.5em; }\n\
         .visible { color: #2e7d32; } .hidden { color: #c62828; }\n\
         table { border-collapse: collapse; } td, th { padding: 2px 12px; text-align: left; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&input.base_url)));
    html.push_str(&format!(
        "<p>Page: <a href=\"{0}\">{0}</a> ({1})<br>Title: {2}</p>\n",
        escape_html(&input.analyzed_url),
        input.depth,
        escape_html(input.title())
    ));
    html.push_str(&format!(
        "<p class=\"gap\">{:.2}%</p>\n<p>of this page's text cannot be read by crawlers that do not run JavaScript.</p>\n",
        input.unreadable_percentage
    ));

    html.push_str(
        "<div class=\"legend\"><span class=\"visible\">&#9632; visible without JavaScript</span>\
         <span class=\"hidden\">&#9632; only visible with JavaScript</span></div>\n",
    );
    html.push_str(&format!(
        "<img class=\"cloud\" alt=\"Word cloud\" src=\"data:{};base64,{}\">\n",
        cloud.mime_type(),
        STANDARD.encode(&image)
    ));

    html.push_str("<h2>Top hidden words</h2>\n<table>\n<tr><th>Word</th><th>Count</th></tr>\n");
    for entry in input.hidden_words().take(TOP_WORDS) {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape_html(&entry.word),
            entry.weight
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");

    Ok(html)
}

pub fn render_report(
    input: &ReportInput,
    format: ReportFormat,
    cloud: &dyn WordCloudRenderer,
) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(input),
        ReportFormat::Markdown => generate_markdown_report(input),
        ReportFormat::Json => generate_json_report(input)?,
        ReportFormat::Html => generate_html_report(input, cloud)?,
    })
}

/// `report_<host>_<timestamp>.<ext>`; characters outside `[A-Za-z0-9.-]` in
/// the host are replaced with `_`.
pub fn report_filename(base_url: &str, timestamp: &str, format: ReportFormat) -> String {
    format!("report_{}_{}.{}", host_slug(base_url), timestamp, format.extension())
}

/// `wordcloud_<host>_<timestamp>.<ext>`, named like the report it belongs to.
pub fn cloud_filename(base_url: &str, timestamp: &str, extension: &str) -> String {
    format!("wordcloud_{}_{}.{}", host_slug(base_url), timestamp, extension)
}

fn host_slug(base_url: &str) -> String {
    let host = url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| base_url.to_string());
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

pub fn save_report(content: impl AsRef<[u8]>, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_ref())?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes one report file per worst page into `dir`. Formats other than
/// HTML get the word cloud as a separate image file next to the report.
pub struct FileReportSink {
    dir: PathBuf,
    format: ReportFormat,
    timestamp: String,
    cloud: Box<dyn WordCloudRenderer>,
    written: Vec<PathBuf>,
}

impl FileReportSink {
    pub fn new(
        dir: impl Into<PathBuf>,
        format: ReportFormat,
        timestamp: impl Into<String>,
        cloud: Box<dyn WordCloudRenderer>,
    ) -> Self {
        Self {
            dir: dir.into(),
            format,
            timestamp: timestamp.into(),
            cloud,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for FileReportSink {
    fn write_report(&mut self, input: &ReportInput) -> Result<()> {
        let content = render_report(input, self.format, self.cloud.as_ref())?;
        let path = self
            .dir
            .join(report_filename(&input.base_url, &self.timestamp, self.format));
        save_report(&content, &path)?;
        info!("Report for {} written to {}", input.base_url, path.display());
        self.written.push(path);

        if self.format != ReportFormat::Html {
            let image = self.cloud.render(&input.cloud_words())?;
            let path = self.dir.join(cloud_filename(
                &input.base_url,
                &self.timestamp,
                self.cloud.extension(),
            ));
            save_report(&image, &path)?;
            info!("Word cloud for {} written to {}", input.base_url, path.display());
            self.written.push(path);
        }
        Ok(())
    }
}
