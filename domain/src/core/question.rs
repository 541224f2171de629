//! Question entity

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a question as assigned by the question source
pub type QuestionId = u64;

/// Question-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Binary,
    Numeric,
    MultipleChoice,
    Date,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Binary => "binary",
            QuestionType::Numeric => "numeric",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Date => "date",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type-specific resolution fields of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Binary,
    Numeric {
        lower_bound: f64,
        upper_bound: f64,
        #[serde(default)]
        open_lower_bound: bool,
        #[serde(default)]
        open_upper_bound: bool,
    },
    MultipleChoice {
        options: Vec<String>,
    },
    Date {
        lower_bound: DateTime<Utc>,
        upper_bound: DateTime<Utc>,
        #[serde(default)]
        open_lower_bound: bool,
        #[serde(default)]
        open_upper_bound: bool,
    },
}

impl QuestionKind {
    /// Type tag of this kind
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Binary => QuestionType::Binary,
            QuestionKind::Numeric { .. } => QuestionType::Numeric,
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Date { .. } => QuestionType::Date,
        }
    }

    fn validate(&self) -> Result<(), DomainError> {
        match self {
            QuestionKind::Binary => Ok(()),
            QuestionKind::Numeric {
                lower_bound,
                upper_bound,
                ..
            } => {
                if !lower_bound.is_finite() || !upper_bound.is_finite() {
                    return Err(DomainError::InvalidQuestion(
                        "numeric bounds must be finite".to_string(),
                    ));
                }
                if lower_bound >= upper_bound {
                    return Err(DomainError::InvalidQuestion(format!(
                        "lower bound {} must be below upper bound {}",
                        lower_bound, upper_bound
                    )));
                }
                Ok(())
            }
            QuestionKind::MultipleChoice { options } => {
                if options.len() < 2 {
                    return Err(DomainError::InvalidQuestion(
                        "multiple choice questions need at least two options".to_string(),
                    ));
                }
                let mut seen = std::collections::HashSet::new();
                for option in options {
                    if option.trim().is_empty() {
                        return Err(DomainError::InvalidQuestion(
                            "options cannot be empty".to_string(),
                        ));
                    }
                    if !seen.insert(option.as_str()) {
                        return Err(DomainError::InvalidQuestion(format!(
                            "duplicate option '{}'",
                            option
                        )));
                    }
                }
                Ok(())
            }
            QuestionKind::Date {
                lower_bound,
                upper_bound,
                ..
            } => {
                if lower_bound >= upper_bound {
                    return Err(DomainError::InvalidQuestion(format!(
                        "lower bound {} must be before upper bound {}",
                        lower_bound, upper_bound
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A forecasting question (Entity)
///
/// Identity and resolution fields are immutable; only `already_forecasted`
/// is updated by the question source between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    question_text: String,
    kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fine_print: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_url: Option<String>,
    #[serde(default)]
    already_forecasted: bool,
}

impl Question {
    /// Create a new question, validating text and type-specific fields
    pub fn new(
        id: QuestionId,
        question_text: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, DomainError> {
        let question = Self {
            id,
            question_text: question_text.into(),
            kind,
            background_info: None,
            resolution_criteria: None,
            fine_print: None,
            page_url: None,
            already_forecasted: false,
        };
        question.validate()?;
        Ok(question)
    }

    /// Create a binary (yes/no) question
    pub fn binary(id: QuestionId, question_text: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(id, question_text, QuestionKind::Binary)
    }

    /// Create a multiple choice question
    pub fn multiple_choice(
        id: QuestionId,
        question_text: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, DomainError> {
        Self::new(id, question_text, QuestionKind::MultipleChoice { options })
    }

    /// Create a numeric question with closed bounds
    pub fn numeric(
        id: QuestionId,
        question_text: impl Into<String>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<Self, DomainError> {
        Self::new(
            id,
            question_text,
            QuestionKind::Numeric {
                lower_bound,
                upper_bound,
                open_lower_bound: false,
                open_upper_bound: false,
            },
        )
    }

    /// Create a date question with closed bounds
    pub fn date(
        id: QuestionId,
        question_text: impl Into<String>,
        lower_bound: DateTime<Utc>,
        upper_bound: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::new(
            id,
            question_text,
            QuestionKind::Date {
                lower_bound,
                upper_bound,
                open_lower_bound: false,
                open_upper_bound: false,
            },
        )
    }

    /// Re-check the invariants (useful after deserialization)
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.question_text.trim().is_empty() {
            return Err(DomainError::InvalidQuestion(
                "question text cannot be empty".to_string(),
            ));
        }
        self.kind.validate()
    }

    // ==================== Builder Methods ====================

    pub fn with_background_info(mut self, info: impl Into<String>) -> Self {
        self.background_info = Some(info.into());
        self
    }

    pub fn with_resolution_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.resolution_criteria = Some(criteria.into());
        self
    }

    pub fn with_fine_print(mut self, fine_print: impl Into<String>) -> Self {
        self.fine_print = Some(fine_print.into());
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_already_forecasted(mut self, already_forecasted: bool) -> Self {
        self.already_forecasted = already_forecasted;
        self
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.question_text
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn background_info(&self) -> Option<&str> {
        self.background_info.as_deref()
    }

    pub fn resolution_criteria(&self) -> Option<&str> {
        self.resolution_criteria.as_deref()
    }

    pub fn fine_print(&self) -> Option<&str> {
        self.fine_print.as_deref()
    }

    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    /// Whether the question source reports an existing forecast
    pub fn already_forecasted(&self) -> bool {
        self.already_forecasted
    }

    /// Updated by the question source when it learns of an existing forecast
    pub fn set_already_forecasted(&mut self, already_forecasted: bool) {
        self.already_forecasted = already_forecasted;
    }

    /// Text a provider sees for this question: the question itself plus any
    /// background, resolution criteria and fine print.
    pub fn context_text(&self) -> String {
        let mut parts = vec![self.question_text.as_str()];
        parts.extend(self.background_info.as_deref());
        parts.extend(self.resolution_criteria.as_deref());
        parts.extend(self.fine_print.as_deref());
        parts.join("\n\n")
    }

    /// Options of a multiple choice question
    pub fn options(&self) -> Option<&[String]> {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => Some(options),
            _ => None,
        }
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] ({}) {}",
            self.id,
            self.question_type(),
            self.question_text
        )
    }
}
