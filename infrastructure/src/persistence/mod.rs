//! Report persistence adapters

mod folder_store;

pub use folder_store::{ForecastArtifact, FolderReportStore, LoadError, load_reports};
