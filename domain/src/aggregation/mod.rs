//! Aggregation of several predictions into one forecast
//!
//! The statistic is a policy: [`AggregationMethod`] covers the built-in
//! measures of central tendency, and anything implementing [`Aggregator`]
//! can be plugged into the question pipeline instead.

use crate::core::error::DomainError;
use crate::core::question::{Question, QuestionKind};
use crate::prediction::value::{OptionProbability, Percentile, PredictionValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Combines the successful predictions of one question into its final value
pub trait Aggregator: Send + Sync {
    /// Name recorded in reports
    fn name(&self) -> String;

    /// Combine predictions; every value has already been validated for `question`
    fn aggregate(
        &self,
        question: &Question,
        predictions: &[PredictionValue],
    ) -> Result<PredictionValue, DomainError>;
}

/// Built-in aggregation statistics
///
/// ```
/// use forecast_domain::aggregation::AggregationMethod;
///
/// assert_eq!(AggregationMethod::Mean.central(&[0.25, 0.5, 0.75]), 0.5);
/// assert_eq!(AggregationMethod::Median.central(&[0.25, 0.75, 0.3]), 0.3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Arithmetic mean
    Mean,
    /// Median; mean of the two middle values for even counts
    #[default]
    Median,
    /// Mean after dropping the lowest and highest value (3+ values)
    TrimmedMean,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::Median => "median",
            AggregationMethod::TrimmedMean => "trimmed_mean",
        }
    }

    /// Central value of a non-empty slice
    pub fn central(&self, values: &[f64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        match self {
            AggregationMethod::Mean => mean(&sorted),
            AggregationMethod::Median => {
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            AggregationMethod::TrimmedMean => {
                if sorted.len() >= 3 {
                    mean(&sorted[1..sorted.len() - 1])
                } else {
                    mean(&sorted)
                }
            }
        }
    }

    fn aggregate_percentiles<T, F, G>(
        &self,
        sets: &[&Vec<Percentile<T>>],
        to_f64: F,
        from_f64: G,
    ) -> Result<Vec<Percentile<T>>, DomainError>
    where
        F: Fn(&T) -> f64,
        G: Fn(f64) -> Result<T, DomainError>,
    {
        let first = sets[0];
        for set in &sets[1..] {
            let same_grid = set.len() == first.len()
                && set
                    .iter()
                    .zip(first.iter())
                    .all(|(a, b)| (a.percentile - b.percentile).abs() < 1e-9);
            if !same_grid {
                return Err(DomainError::Aggregation(
                    "predictions use different percentile grids".to_string(),
                ));
            }
        }

        first
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let values: Vec<f64> = sets.iter().map(|set| to_f64(&set[i].value)).collect();
                Ok(Percentile::new(point.percentile, from_f64(self.central(&values))?))
            })
            .collect()
    }
}

impl Aggregator for AggregationMethod {
    fn name(&self) -> String {
        self.as_str().to_string()
    }

    fn aggregate(
        &self,
        question: &Question,
        predictions: &[PredictionValue],
    ) -> Result<PredictionValue, DomainError> {
        if predictions.is_empty() {
            return Err(DomainError::NoPredictions);
        }

        match question.kind() {
            QuestionKind::Binary => {
                let probabilities = predictions
                    .iter()
                    .map(|p| p.as_probability().ok_or_else(|| mismatch(question, p)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PredictionValue::Binary(self.central(&probabilities)))
            }
            QuestionKind::MultipleChoice { options } => {
                let sets = predictions
                    .iter()
                    .map(|p| match p {
                        PredictionValue::MultipleChoice(entries) => Ok(entries),
                        other => Err(mismatch(question, other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let mut combined = Vec::with_capacity(options.len());
                for option in options {
                    let values = sets
                        .iter()
                        .map(|entries| {
                            entries
                                .iter()
                                .find(|e| &e.option == option)
                                .map(|e| e.probability)
                                .ok_or_else(|| {
                                    DomainError::Aggregation(format!(
                                        "prediction lacks option '{}'",
                                        option
                                    ))
                                })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    combined.push(OptionProbability::new(option.clone(), self.central(&values)));
                }

                let total: f64 = combined.iter().map(|o| o.probability).sum();
                if total <= 0.0 {
                    return Err(DomainError::Aggregation(
                        "all option probabilities aggregate to zero".to_string(),
                    ));
                }
                for entry in &mut combined {
                    entry.probability /= total;
                }
                Ok(PredictionValue::MultipleChoice(combined))
            }
            QuestionKind::Numeric { .. } => {
                let sets = predictions
                    .iter()
                    .map(|p| match p {
                        PredictionValue::Numeric(points) => Ok(points),
                        other => Err(mismatch(question, other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let points = self.aggregate_percentiles(&sets, |v| *v, Ok)?;
                Ok(PredictionValue::Numeric(points))
            }
            QuestionKind::Date { .. } => {
                let sets = predictions
                    .iter()
                    .map(|p| match p {
                        PredictionValue::Date(points) => Ok(points),
                        other => Err(mismatch(question, other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let points = self.aggregate_percentiles(
                    &sets,
                    |d| d.timestamp_millis() as f64,
                    |ms| {
                        DateTime::<Utc>::from_timestamp_millis(ms.round() as i64).ok_or_else(
                            || DomainError::Aggregation(format!("timestamp {} out of range", ms)),
                        )
                    },
                )?;
                Ok(PredictionValue::Date(points))
            }
        }
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AggregationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "mean" | "average" => Ok(AggregationMethod::Mean),
            "median" => Ok(AggregationMethod::Median),
            "trimmed_mean" => Ok(AggregationMethod::TrimmedMean),
            _ => Err(format!(
                "Unknown aggregation method: {}. Valid: mean, median, trimmed_mean",
                s
            )),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mismatch(question: &Question, value: &PredictionValue) -> DomainError {
    DomainError::KindMismatch {
        expected: question.question_type().to_string(),
        actual: value.question_type().to_string(),
    }
}
