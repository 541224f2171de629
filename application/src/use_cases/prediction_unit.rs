//! Prediction unit
//!
//! One prediction attempt from one research text. The provider's value is
//! validated against the question before it counts as a success.

use crate::ports::prediction::Predictor;
use crate::ports::provider::ProviderError;
use crate::quota::{QuotaError, QuotaRegistry};
use forecast_domain::{DomainError, FailureKind, Question, ReasonedPrediction, ReportError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a single prediction attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Prediction with {model} failed: {source}")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("Prediction from {model} rejected: {source}")]
    Invalid {
        model: String,
        #[source]
        source: DomainError,
    },

    #[error("Prediction task aborted: {0}")]
    Aborted(String),
}

impl PredictionError {
    /// Cause tag stored on the report
    pub fn cause_name(&self) -> &'static str {
        match self {
            PredictionError::Provider { source, .. } => source.cause_name(),
            PredictionError::Quota(e) => e.cause_name(),
            PredictionError::Invalid {
                source: DomainError::KindMismatch { .. },
                ..
            } => "KindMismatch",
            PredictionError::Invalid { .. } => "InvalidPrediction",
            PredictionError::Aborted(_) => "TaskAborted",
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            PredictionError::Provider { model, .. } | PredictionError::Invalid { model, .. } => {
                Some(model)
            }
            PredictionError::Quota(QuotaError::Timeout { model, .. })
            | PredictionError::Quota(QuotaError::ExceedsCapacity { model, .. }) => Some(model),
            PredictionError::Aborted(_) => None,
        }
    }

    pub fn to_report_error(&self) -> ReportError {
        let error = ReportError::new(
            FailureKind::PredictionError,
            self.cause_name(),
            self.to_string(),
        );
        match self.model() {
            Some(model) => error.with_model(model),
            None => error,
        }
    }
}

/// Runs prediction attempts through the quota gate of the predictor's model.
#[derive(Clone)]
pub struct PredictionUnit {
    predictor: Arc<dyn Predictor>,
    quotas: Arc<QuotaRegistry>,
}

impl PredictionUnit {
    pub fn new(predictor: Arc<dyn Predictor>, quotas: Arc<QuotaRegistry>) -> Self {
        Self { predictor, quotas }
    }

    pub async fn run(
        &self,
        question: &Question,
        research: &str,
    ) -> Result<ReasonedPrediction, PredictionError> {
        let model = self.predictor.model();
        let estimate = self.predictor.estimate_tokens(question, research);
        let permit = self.quotas.acquire(&model, estimate).await?;

        let response = self
            .predictor
            .predict(question, research)
            .await
            .map_err(|source| PredictionError::Provider {
                model: model.to_string(),
                source,
            })?;
        permit.complete(response.tokens_used);

        let prediction = response.value;
        if let Err(source) = prediction.prediction_value.validate_for(question) {
            warn!(
                "Rejected prediction for question {} from {}: {}",
                question.id(),
                model,
                source
            );
            return Err(PredictionError::Invalid {
                model: model.to_string(),
                source,
            });
        }

        debug!(
            "Prediction for question {} from {}: {}",
            question.id(),
            model,
            prediction.prediction_value
        );
        Ok(prediction)
    }
}
