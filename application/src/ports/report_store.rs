//! Report persistence port

use async_trait::async_trait;
use forecast_domain::{ForecastReport, RunType};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting reports
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sink for completed batches of reports
///
/// One call writes one artifact. Implementations return `Ok(None)` when
/// there is nothing to write (no reports or no folder).
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save_reports(
        &self,
        reports: &[ForecastReport],
        run_type: RunType,
        folder: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError>;
}

/// Store that discards everything, for runs without persistence
pub struct NoReportStore;

#[async_trait]
impl ReportStore for NoReportStore {
    async fn save_reports(
        &self,
        _reports: &[ForecastReport],
        _run_type: RunType,
        _folder: Option<&Path>,
    ) -> Result<Option<PathBuf>, StoreError> {
        Ok(None)
    }
}
