//! Site list input and result CSV output.

use crate::audit::ResultSink;
use crate::error::Result;
use crate::model::{Site, SsrResult};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct SiteRecord {
    pub url: String,
}

/// Read sites from a CSV file with a `url` column, in file order. Blank rows
/// are skipped; unparsable URLs are logged and skipped.
pub fn read_sites(path: &Path) -> Result<Vec<Site>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut sites = Vec::new();
    for record in reader.deserialize::<SiteRecord>() {
        let record = record?;
        if record.url.trim().is_empty() {
            continue;
        }
        match Site::parse(&record.url) {
            Ok(site) => sites.push(site),
            Err(e) => warn!("Skipping input row: {}", e),
        }
    }

    debug!("Read {} sites from {}", sites.len(), path.display());
    Ok(sites)
}

/// Local time as `YYYYmmdd_HHMMSS`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn results_filename(timestamp: &str) -> String {
    format!("ssr_results_{}.csv", timestamp)
}

/// Column names of the result file, matching the `SsrResult` field renames.
pub const RESULT_HEADERS: [&str; 5] = [
    "Base URL",
    "Analyzed URL",
    "Is Framework Detected",
    "SSR Percentage",
    "Page Depth",
];

// Headers are written by hand so a batch with no rows still gets them.
fn result_writer(path: &Path) -> Result<csv::Writer<File>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(RESULT_HEADERS)?;
    writer.flush()?;
    Ok(writer)
}

/// Appends rows as each site completes and rewrites the file from the full
/// set of rows when the batch finishes.
pub struct CsvResultWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvResultWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = result_writer(&path)?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvResultWriter {
    fn write_rows(&mut self, rows: &[SsrResult]) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self, rows: &[SsrResult]) -> Result<()> {
        self.writer.flush()?;
        let mut summary = result_writer(&self.path)?;
        for row in rows {
            summary.serialize(row)?;
        }
        summary.flush()?;
        Ok(())
    }
}

pub fn read_results(path: &Path) -> Result<Vec<SsrResult>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<SsrResult>, _>>()?;
    Ok(rows)
}
