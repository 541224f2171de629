//! Infrastructure layer for forecast-bot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod persistence;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileBotConfig, FileConfig, FileLoggingConfig, FileOutputConfig,
    FileQuotaConfig, FileQuotasConfig,
};
pub use logging::JsonlForecastLogger;
pub use persistence::{ForecastArtifact, FolderReportStore, LoadError, load_reports};
