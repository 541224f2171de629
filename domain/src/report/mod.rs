//! Forecast reports and their audit trail
//!
//! - [`entities::ForecastReport`]: the outcome of one question pipeline
//! - [`errors::ReportError`]: a tolerated sub-task failure recorded in a report
//! - [`artifact`]: naming of persisted report batches

pub mod artifact;
pub mod entities;
pub mod errors;
