//! Reasoned prediction value object

use super::value::PredictionValue;
use serde::{Deserialize, Serialize};

/// A prediction together with the rationale that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonedPrediction {
    pub prediction_value: PredictionValue,
    pub reasoning: String,
}

impl ReasonedPrediction {
    pub fn new(prediction_value: PredictionValue, reasoning: impl Into<String>) -> Self {
        Self {
            prediction_value,
            reasoning: reasoning.into(),
        }
    }

    /// Shorthand for a binary prediction
    pub fn binary(probability: f64, reasoning: impl Into<String>) -> Self {
        Self::new(PredictionValue::Binary(probability), reasoning)
    }
}
