//! Prediction value object

use crate::core::error::DomainError;
use crate::core::question::{Question, QuestionKind, QuestionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tolerance on the sum of multiple choice probabilities
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

/// One point of a cumulative distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile<T> {
    /// Cumulative probability in (0, 1)
    pub percentile: f64,
    pub value: T,
}

impl<T> Percentile<T> {
    pub fn new(percentile: f64, value: T) -> Self {
        Self { percentile, value }
    }
}

/// Probability assigned to one option of a multiple choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionProbability {
    pub option: String,
    pub probability: f64,
}

impl OptionProbability {
    pub fn new(option: impl Into<String>, probability: f64) -> Self {
        Self {
            option: option.into(),
            probability,
        }
    }
}

/// The forecast for one question (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PredictionValue {
    /// Probability that the question resolves yes
    Binary(f64),
    /// Percentiles of the numeric outcome
    Numeric(Vec<Percentile<f64>>),
    /// Probability per option
    MultipleChoice(Vec<OptionProbability>),
    /// Percentiles of the resolution date
    Date(Vec<Percentile<DateTime<Utc>>>),
}

impl PredictionValue {
    pub fn question_type(&self) -> QuestionType {
        match self {
            PredictionValue::Binary(_) => QuestionType::Binary,
            PredictionValue::Numeric(_) => QuestionType::Numeric,
            PredictionValue::MultipleChoice(_) => QuestionType::MultipleChoice,
            PredictionValue::Date(_) => QuestionType::Date,
        }
    }

    /// Binary probability, if this is a binary prediction
    pub fn as_probability(&self) -> Option<f64> {
        match self {
            PredictionValue::Binary(p) => Some(*p),
            _ => None,
        }
    }

    /// Check the value is well-formed on its own
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            PredictionValue::Binary(p) => check_probability(*p, "probability"),
            PredictionValue::MultipleChoice(options) => {
                if options.is_empty() {
                    return Err(DomainError::InvalidPrediction(
                        "no option probabilities".to_string(),
                    ));
                }
                let mut seen = std::collections::HashSet::new();
                let mut sum = 0.0;
                for entry in options {
                    check_probability(entry.probability, &entry.option)?;
                    if !seen.insert(entry.option.as_str()) {
                        return Err(DomainError::InvalidPrediction(format!(
                            "option '{}' listed twice",
                            entry.option
                        )));
                    }
                    sum += entry.probability;
                }
                if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                    return Err(DomainError::InvalidPrediction(format!(
                        "option probabilities sum to {:.3}, expected 1",
                        sum
                    )));
                }
                Ok(())
            }
            PredictionValue::Numeric(percentiles) => {
                if percentiles.iter().any(|p| !p.value.is_finite()) {
                    return Err(DomainError::InvalidPrediction(
                        "numeric percentile values must be finite".to_string(),
                    ));
                }
                check_percentiles(percentiles)
            }
            PredictionValue::Date(percentiles) => check_percentiles(percentiles),
        }
    }

    /// Check the value answers the given question
    pub fn validate_for(&self, question: &Question) -> Result<(), DomainError> {
        if self.question_type() != question.question_type() {
            return Err(DomainError::KindMismatch {
                expected: question.question_type().to_string(),
                actual: self.question_type().to_string(),
            });
        }
        self.validate()?;

        if let (PredictionValue::MultipleChoice(entries), QuestionKind::MultipleChoice { options }) =
            (self, question.kind())
        {
            let missing: Vec<&str> = options
                .iter()
                .filter(|o| !entries.iter().any(|e| &e.option == *o))
                .map(|o| o.as_str())
                .collect();
            if !missing.is_empty() || entries.len() != options.len() {
                return Err(DomainError::InvalidPrediction(format!(
                    "option set does not match question (missing: [{}])",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionValue::Binary(p) => write!(f, "{:.1}%", p * 100.0),
            PredictionValue::MultipleChoice(options) => {
                let parts: Vec<String> = options
                    .iter()
                    .map(|o| format!("{}: {:.1}%", o.option, o.probability * 100.0))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            PredictionValue::Numeric(percentiles) => {
                let parts: Vec<String> = percentiles
                    .iter()
                    .map(|p| format!("p{:.0}={}", p.percentile * 100.0, p.value))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            PredictionValue::Date(percentiles) => {
                let parts: Vec<String> = percentiles
                    .iter()
                    .map(|p| {
                        format!(
                            "p{:.0}={}",
                            p.percentile * 100.0,
                            p.value.format("%Y-%m-%d")
                        )
                    })
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

fn check_probability(p: f64, label: &str) -> Result<(), DomainError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(DomainError::InvalidPrediction(format!(
            "{} {} outside [0, 1]",
            label, p
        )));
    }
    Ok(())
}

fn check_percentiles<T: PartialOrd>(percentiles: &[Percentile<T>]) -> Result<(), DomainError> {
    if percentiles.is_empty() {
        return Err(DomainError::InvalidPrediction(
            "no percentiles given".to_string(),
        ));
    }
    for p in percentiles {
        if !(p.percentile > 0.0 && p.percentile < 1.0) {
            return Err(DomainError::InvalidPrediction(format!(
                "percentile {} outside (0, 1)",
                p.percentile
            )));
        }
    }
    for pair in percentiles.windows(2) {
        if pair[1].percentile <= pair[0].percentile {
            return Err(DomainError::InvalidPrediction(
                "percentiles must be strictly increasing".to_string(),
            ));
        }
        if pair[1].value < pair[0].value {
            return Err(DomainError::InvalidPrediction(
                "percentile values must be non-decreasing".to_string(),
            ));
        }
    }
    Ok(())
}
