//! Result rows and per-site audit outputs.

use crate::error::{AuditError, Result};
use rendergap_scanner::PageAnalysis;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// One audited site: the address as given, plus the homepage derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub base_url: String,
    pub homepage: Url,
}

impl Site {
    /// Accepts bare hosts (`example.com`) as well as full URLs. The homepage
    /// keeps scheme, host and non-default port and resets the path to `/`.
    pub fn parse(input: &str) -> Result<Self> {
        let base_url = normalize_site_url(input);
        if base_url.is_empty() {
            return Err(AuditError::InvalidSite(input.to_string()));
        }

        let parsed =
            Url::parse(&base_url).map_err(|_| AuditError::InvalidSite(input.to_string()))?;
        if parsed.host_str().is_none() {
            return Err(AuditError::InvalidSite(input.to_string()));
        }

        let mut homepage = parsed;
        homepage.set_path("/");
        homepage.set_query(None);
        homepage.set_fragment(None);

        Ok(Self { base_url, homepage })
    }

    pub fn host(&self) -> &str {
        self.homepage.host_str().unwrap_or("unknown")
    }
}

/// Trim the input and prefix `https://` when no scheme is present.
pub fn normalize_site_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// The SSR column: a percentage or one of two markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SsrValue {
    Percentage(f64),
    NotApplicable,
    Error,
}

impl SsrValue {
    pub fn percentage(&self) -> Option<f64> {
        match self {
            SsrValue::Percentage(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for SsrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsrValue::Percentage(p) => write!(f, "{:.2}", p),
            SsrValue::NotApplicable => f.write_str("N/A"),
            SsrValue::Error => f.write_str("Error"),
        }
    }
}

impl FromStr for SsrValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "N/A" => Ok(SsrValue::NotApplicable),
            "Error" => Ok(SsrValue::Error),
            other => other
                .parse::<f64>()
                .map(SsrValue::Percentage)
                .map_err(|_| format!("invalid SSR value '{}'", other)),
        }
    }
}

impl Serialize for SsrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SsrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDepth {
    Homepage,
    Mid,
    Deep,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for PageDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PageDepth::Homepage => "Homepage",
            PageDepth::Mid => "Mid",
            PageDepth::Deep => "Deep",
            PageDepth::NotApplicable => "N/A",
        };
        f.write_str(label)
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsrResult {
    #[serde(rename = "Base URL")]
    pub base_url: String,
    #[serde(rename = "Analyzed URL")]
    pub analyzed_url: String,
    #[serde(rename = "Is Framework Detected")]
    pub framework_detected: bool,
    #[serde(rename = "SSR Percentage")]
    pub ssr: SsrValue,
    #[serde(rename = "Page Depth")]
    pub depth: PageDepth,
}

impl SsrResult {
    /// Row for a site where no supported framework was found.
    pub fn not_applicable(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            analyzed_url: "N/A".to_string(),
            framework_detected: false,
            ssr: SsrValue::NotApplicable,
            depth: PageDepth::NotApplicable,
        }
    }

    /// Row for a site whose audit failed before any page produced a result.
    pub fn site_error(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            analyzed_url: "N/A".to_string(),
            framework_detected: false,
            ssr: SsrValue::Error,
            depth: PageDepth::NotApplicable,
        }
    }

    pub fn page_error(base_url: &str, analyzed_url: &str, depth: PageDepth) -> Self {
        Self {
            base_url: base_url.to_string(),
            analyzed_url: analyzed_url.to_string(),
            framework_detected: true,
            ssr: SsrValue::Error,
            depth,
        }
    }

    pub fn analyzed(base_url: &str, analysis: &PageAnalysis, depth: PageDepth) -> Self {
        Self {
            base_url: base_url.to_string(),
            analyzed_url: analysis.url.clone(),
            framework_detected: true,
            ssr: SsrValue::Percentage(analysis.ssr_percentage),
            depth,
        }
    }
}

/// The analyzed page with the lowest SSR percentage on a site.
#[derive(Debug, Clone)]
pub struct WorstPage {
    pub depth: PageDepth,
    pub analysis: PageAnalysis,
}

impl WorstPage {
    /// Share of the rendered text a non-scripting crawler cannot read.
    pub fn unreadable_percentage(&self) -> f64 {
        ((100.0 - self.analysis.ssr_percentage) * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteReport {
    pub rows: Vec<SsrResult>,
    pub worst: Option<WorstPage>,
}

impl SiteReport {
    /// Keep `analysis` as the worst page only if it is strictly lower than
    /// the current one.
    pub fn offer(&mut self, depth: PageDepth, analysis: &PageAnalysis) {
        let replace = match &self.worst {
            Some(current) => analysis.ssr_percentage < current.analysis.ssr_percentage,
            None => true,
        };
        if replace {
            self.worst = Some(WorstPage {
                depth,
                analysis: analysis.clone(),
            });
        }
    }
}
