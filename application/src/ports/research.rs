//! Research provider port
//!
//! Produces research text for a question and, optionally, a condensed
//! summary of that text.

use super::provider::{Metered, ProviderError};
use async_trait::async_trait;
use forecast_domain::{Model, Question, estimate_tokens};

/// Source of research for a question
///
/// Implementations live in the infrastructure layer (or in tests as
/// scripted fakes). Each call is admitted through the quota gate of the
/// model returned by [`Researcher::model`] / [`Researcher::summary_model`].
#[async_trait]
pub trait Researcher: Send + Sync {
    /// Model the research call is accounted against
    fn model(&self) -> Model;

    /// Model the summarization call is accounted against
    fn summary_model(&self) -> Model {
        self.model()
    }

    /// Token estimate used to reserve quota before [`Researcher::run_research`]
    fn estimate_research_tokens(&self, question: &Question) -> u64 {
        estimate_tokens(&question.context_text())
    }

    /// Token estimate used to reserve quota before [`Researcher::summarize_research`]
    fn estimate_summary_tokens(&self, question: &Question, research: &str) -> u64 {
        estimate_tokens(question.text()) + estimate_tokens(research)
    }

    /// Run one research pass
    async fn run_research(&self, question: &Question) -> Result<Metered<String>, ProviderError>;

    /// Condense a research text
    async fn summarize_research(
        &self,
        _question: &Question,
        _research: &str,
    ) -> Result<Metered<String>, ProviderError> {
        Err(ProviderError::Unsupported(
            "this researcher cannot summarize".to_string(),
        ))
    }
}
