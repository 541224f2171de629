//! Forecast report entity

use super::errors::ReportError;
use crate::aggregation::Aggregator;
use crate::core::error::DomainError;
use crate::core::question::Question;
use crate::prediction::reasoned::ReasonedPrediction;
use crate::prediction::value::PredictionValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of one research unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// Full research text
    pub research: String,
    /// Summary handed to prediction instead of the full text, when enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ResearchRecord {
    pub fn new(research: impl Into<String>) -> Self {
        Self {
            research: research.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Text the prediction units see
    pub fn forecast_input(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.research)
    }
}

/// Completed forecast for one question (Entity)
///
/// Built only through [`ForecastReport::aggregate`], so a report always
/// carries a final prediction derived from at least one successful
/// prediction. Tolerated failures are kept in encounter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    question: Question,
    prediction: PredictionValue,
    research: Vec<ResearchRecord>,
    predictions: Vec<ReasonedPrediction>,
    errors: Vec<ReportError>,
    aggregation: String,
    created_at: DateTime<Utc>,
}

impl ForecastReport {
    /// Aggregate successful predictions into a report
    pub fn aggregate(
        question: Question,
        research: Vec<ResearchRecord>,
        predictions: Vec<ReasonedPrediction>,
        errors: Vec<ReportError>,
        aggregator: &dyn Aggregator,
    ) -> Result<Self, DomainError> {
        let values: Vec<PredictionValue> = predictions
            .iter()
            .map(|p| p.prediction_value.clone())
            .collect();
        let prediction = aggregator.aggregate(&question, &values)?;
        prediction.validate_for(&question).map_err(|e| {
            DomainError::Aggregation(format!("aggregated value is invalid: {}", e))
        })?;

        Ok(Self {
            question,
            prediction,
            research,
            predictions,
            errors,
            aggregation: aggregator.name(),
            created_at: Utc::now(),
        })
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Final aggregated prediction
    pub fn prediction(&self) -> &PredictionValue {
        &self.prediction
    }

    pub fn research(&self) -> &[ResearchRecord] {
        &self.research
    }

    /// Individual predictions that went into the aggregate
    pub fn predictions(&self) -> &[ReasonedPrediction] {
        &self.predictions
    }

    pub fn errors(&self) -> &[ReportError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Name of the aggregation policy used
    pub fn aggregation(&self) -> &str {
        &self.aggregation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
