//! Application layer for forecast-bot
//!
//! This crate contains use cases, port definitions, the per-model quota
//! gate, and application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod quota;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BotConfig, ConfigValue};
pub use ports::{
    event_logger::{ForecastEvent, ForecastEventLogger, NoEventLogger},
    prediction::Predictor,
    progress::{ForecastProgressNotifier, NoProgress},
    provider::{Metered, ProviderError},
    report_store::{NoReportStore, ReportStore, StoreError},
    research::Researcher,
};
pub use quota::{QuotaError, QuotaGate, QuotaPermit, QuotaRegistry, QuotaSnapshot};
pub use use_cases::forecast_question::{ForecastError, ForecastQuestionUseCase};
pub use use_cases::forecast_questions::{
    BatchResult, BatchSummary, ForecastBatchUseCase, QuestionOutcome,
};
pub use use_cases::prediction_unit::{PredictionError, PredictionUnit};
pub use use_cases::research_unit::{ResearchError, ResearchUnit};
