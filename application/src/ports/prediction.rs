//! Prediction provider port

use super::provider::{Metered, ProviderError};
use async_trait::async_trait;
use forecast_domain::{Model, Question, ReasonedPrediction, estimate_tokens};

/// Turns a question plus research text into a reasoned prediction
///
/// The returned value must match the question's type; the prediction unit
/// rejects mismatches as tolerated failures.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Model the prediction call is accounted against
    fn model(&self) -> Model;

    /// Token estimate used to reserve quota before [`Predictor::predict`]
    fn estimate_tokens(&self, question: &Question, research: &str) -> u64 {
        estimate_tokens(&format!("{}\n\n{}", question.context_text(), research))
    }

    async fn predict(
        &self,
        question: &Question,
        research: &str,
    ) -> Result<Metered<ReasonedPrediction>, ProviderError>;
}
