use rendergap_scanner::ScanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Invalid site URL '{0}'")]
    InvalidSite(String),

    #[error("Unknown report format '{0}'")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
