//! Domain layer for forecast-bot
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Question → Report
//!
//! A [`Question`] is researched several times, each research text feeds
//! several [`ReasonedPrediction`]s, and the successful predictions are
//! combined by an [`Aggregator`] into a [`ForecastReport`]. Failures that
//! did not sink the question are kept on the report as [`ReportError`]s.
//!
//! ## Quotas
//!
//! Every provider call is scoped to a [`Model`] identity whose
//! [`QuotaConfig`] caps requests and tokens per fixed window.

pub mod aggregation;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod prediction;
pub mod quota;
pub mod report;

// Re-export commonly used types
pub use aggregation::{AggregationMethod, Aggregator};
pub use config::{
    OutputFormat,
    config_key::{ConfigKeyInfo, known_keys, lookup_key},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use core::{
    error::DomainError,
    model::Model,
    question::{Question, QuestionId, QuestionKind, QuestionType},
    string::preview,
};
pub use pipeline::PipelineStage;
pub use prediction::{
    reasoned::ReasonedPrediction,
    value::{OptionProbability, Percentile, PredictionValue},
};
pub use quota::{QuotaConfig, estimate_tokens};
pub use report::{
    artifact::{
        ARTIFACT_PREFIX, RunType, artifact_file_name, artifact_file_name_with_sequence,
    },
    entities::{ForecastReport, ResearchRecord},
    errors::{FailureKind, ReportError},
};
