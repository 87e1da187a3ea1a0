pub mod audit;
pub mod diff;
pub mod error;
pub mod io;
pub mod model;
pub mod report;
pub mod selector;
pub mod wordcloud;

pub use audit::{AuditConfig, Auditor, ReportSink, ResultSink, SiteAuditor, run_batch};
pub use error::AuditError;
pub use model::{PageDepth, Site, SiteReport, SsrResult, SsrValue};
