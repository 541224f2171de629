//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation
//! adapters implement.

pub mod event_logger;
pub mod prediction;
pub mod progress;
pub mod provider;
pub mod report_store;
pub mod research;
