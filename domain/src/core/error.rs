//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("Prediction kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    #[error("Invalid quota: {0}")]
    InvalidQuota(String),

    #[error("Aggregation failed: {0}")]
    Aggregation(String),

    #[error("Nothing to aggregate")]
    NoPredictions,
}

impl DomainError {
    /// Check if this error was caused by a malformed prediction value
    pub fn is_prediction_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidPrediction(_) | DomainError::KindMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mismatch_display() {
        let error = DomainError::KindMismatch {
            expected: "binary".to_string(),
            actual: "numeric".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Prediction kind mismatch: expected binary, got numeric"
        );
    }

    #[test]
    fn test_is_prediction_error_check() {
        assert!(DomainError::InvalidPrediction("x".to_string()).is_prediction_error());
        assert!(!DomainError::NoPredictions.is_prediction_error());
        assert!(!DomainError::InvalidQuota("x".to_string()).is_prediction_error());
    }
}
