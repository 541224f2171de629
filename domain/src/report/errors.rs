//! Tolerated failures recorded in a report

use serde::{Deserialize, Serialize};

/// Which kind of sub-task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    ResearchError,
    PredictionError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ResearchError => "ResearchError",
            FailureKind::PredictionError => "PredictionError",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed research or prediction attempt that did not fail the question
///
/// `cause` names the underlying failure (e.g. `QuotaTimeout`,
/// `ProviderError`) and `message` carries its full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub kind: FailureKind,
    pub cause: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ReportError {
    pub fn new(kind: FailureKind, cause: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
            message: message.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}): {}", self.kind, self.cause, self.message)?;
        if let Some(model) = &self.model {
            write!(f, " [model: {}]", model)?;
        }
        Ok(())
    }
}
