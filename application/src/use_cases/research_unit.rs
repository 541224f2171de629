//! Research unit
//!
//! One research pass for one question: quota admission, the provider call,
//! and the optional summarization step.

use crate::ports::provider::ProviderError;
use crate::ports::research::Researcher;
use crate::quota::{QuotaError, QuotaRegistry};
use forecast_domain::{FailureKind, Question, ReportError, ResearchRecord};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a single research pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResearchError {
    #[error("Research with {model} failed: {source}")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error("Summarization with {model} failed: {source}")]
    Summarization {
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("Research with {model} returned no text")]
    EmptyResearch { model: String },

    #[error("Research task aborted: {0}")]
    Aborted(String),
}

impl ResearchError {
    /// Cause tag stored on the report
    pub fn cause_name(&self) -> &'static str {
        match self {
            ResearchError::Provider { source, .. } => source.cause_name(),
            ResearchError::Summarization { .. } => "SummarizationFailed",
            ResearchError::Quota(e) => e.cause_name(),
            ResearchError::EmptyResearch { .. } => "EmptyResearch",
            ResearchError::Aborted(_) => "TaskAborted",
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            ResearchError::Provider { model, .. }
            | ResearchError::Summarization { model, .. }
            | ResearchError::EmptyResearch { model } => Some(model),
            ResearchError::Quota(QuotaError::Timeout { model, .. })
            | ResearchError::Quota(QuotaError::ExceedsCapacity { model, .. }) => Some(model),
            ResearchError::Aborted(_) => None,
        }
    }

    pub fn to_report_error(&self) -> ReportError {
        let error = ReportError::new(
            FailureKind::ResearchError,
            self.cause_name(),
            self.to_string(),
        );
        match self.model() {
            Some(model) => error.with_model(model),
            None => error,
        }
    }
}

/// Runs research passes through the quota gate of the researcher's models.
#[derive(Clone)]
pub struct ResearchUnit {
    researcher: Arc<dyn Researcher>,
    quotas: Arc<QuotaRegistry>,
    summarize: bool,
}

impl ResearchUnit {
    pub fn new(researcher: Arc<dyn Researcher>, quotas: Arc<QuotaRegistry>) -> Self {
        Self {
            researcher,
            quotas,
            summarize: false,
        }
    }

    /// Summarize each research text and forecast from the summary
    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.summarize = enabled;
        self
    }

    pub async fn run(&self, question: &Question) -> Result<ResearchRecord, ResearchError> {
        let model = self.researcher.model();
        let estimate = self.researcher.estimate_research_tokens(question);
        let permit = self.quotas.acquire(&model, estimate).await?;

        // A failed call keeps its reservation and is charged the estimate.
        let response = self
            .researcher
            .run_research(question)
            .await
            .map_err(|source| ResearchError::Provider {
                model: model.to_string(),
                source,
            })?;
        permit.complete(response.tokens_used);

        let research = response.value;
        if research.trim().is_empty() {
            warn!("Empty research for question {} from {}", question.id(), model);
            return Err(ResearchError::EmptyResearch {
                model: model.to_string(),
            });
        }
        debug!(
            "Research for question {} from {}: {} chars",
            question.id(),
            model,
            research.len()
        );

        if !self.summarize {
            return Ok(ResearchRecord::new(research));
        }

        let summary = self.summarize(question, &research).await?;
        Ok(ResearchRecord::new(research).with_summary(summary))
    }

    async fn summarize(&self, question: &Question, research: &str) -> Result<String, ResearchError> {
        let model = self.researcher.summary_model();
        let estimate = self.researcher.estimate_summary_tokens(question, research);
        let permit = self.quotas.acquire(&model, estimate).await?;

        let response = self
            .researcher
            .summarize_research(question, research)
            .await
            .map_err(|source| ResearchError::Summarization {
                model: model.to_string(),
                source,
            })?;
        permit.complete(response.tokens_used);
        Ok(response.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::ScriptedResearcher;
    use forecast_domain::{Model, QuotaConfig};
    use std::time::Duration;

    fn question() -> Question {
        Question::binary(1, "Will it rain?").unwrap()
    }

    #[tokio::test]
    async fn test_research_without_summary() {
        let researcher = Arc::new(ScriptedResearcher::new("clouds everywhere"));
        let unit = ResearchUnit::new(researcher.clone(), Arc::new(QuotaRegistry::new()));

        let record = unit.run(&question()).await.unwrap();

        assert_eq!(record.research, "clouds everywhere");
        assert!(record.summary.is_none());
        assert_eq!(researcher.research_calls(), 1);
        assert_eq!(researcher.summary_calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_replaces_forecast_input() {
        let researcher = Arc::new(ScriptedResearcher::new("long research text"));
        let unit =
            ResearchUnit::new(researcher.clone(), Arc::new(QuotaRegistry::new())).with_summary(true);

        let record = unit.run(&question()).await.unwrap();

        assert_eq!(record.forecast_input(), "summary of long research text");
        assert_eq!(researcher.summary_calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_research_error() {
        let researcher = Arc::new(ScriptedResearcher::new("x").failing_after(0));
        let unit = ResearchUnit::new(researcher, Arc::new(QuotaRegistry::new()));

        let err = unit.run(&question()).await.unwrap_err();

        assert!(matches!(err, ResearchError::Provider { .. }));
        let report_error = err.to_report_error();
        assert_eq!(report_error.kind, FailureKind::ResearchError);
        assert_eq!(report_error.cause, "RequestFailed");
        assert_eq!(report_error.model.as_deref(), Some("o3-mini"));
    }

    #[tokio::test]
    async fn test_blank_research_rejected() {
        let researcher = Arc::new(ScriptedResearcher::new("   "));
        let unit = ResearchUnit::new(researcher, Arc::new(QuotaRegistry::new()));

        let err = unit.run(&question()).await.unwrap_err();
        assert_eq!(err.cause_name(), "EmptyResearch");
    }

    #[tokio::test]
    async fn test_quota_capacity_error_is_research_error() {
        let tiny = QuotaConfig::new(10, 5, Duration::from_secs(60), Duration::from_secs(1));
        let quotas = Arc::new(QuotaRegistry::new().with_quota(Model::O3Mini, tiny));
        let researcher = Arc::new(ScriptedResearcher::new("x"));
        let unit = ResearchUnit::new(researcher.clone(), quotas);

        let err = unit.run(&question()).await.unwrap_err();

        assert_eq!(err.cause_name(), "QuotaExceedsCapacity");
        assert_eq!(researcher.research_calls(), 0);
    }

    #[tokio::test]
    async fn test_usage_settles_quota_at_actual_tokens() {
        let quotas = Arc::new(QuotaRegistry::new());
        let researcher = Arc::new(ScriptedResearcher::new("x").with_usage(321));
        let unit = ResearchUnit::new(researcher, quotas.clone());

        unit.run(&question()).await.unwrap();

        let snapshot = quotas.snapshot(&Model::O3Mini).unwrap();
        assert_eq!(snapshot.tokens_consumed, 321);
        assert_eq!(snapshot.tokens_reserved, 0);
    }
}
