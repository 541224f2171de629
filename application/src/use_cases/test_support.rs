//! Scripted providers shared by the use case tests.

use crate::ports::prediction::Predictor;
use crate::ports::provider::{Metered, ProviderError};
use crate::ports::research::Researcher;
use async_trait::async_trait;
use forecast_domain::{Model, PredictionValue, Question, ReasonedPrediction};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct ScriptedResearcher {
    model: Model,
    text: String,
    fail_from_call: Option<usize>,
    usage: Option<u64>,
    delay: Option<Duration>,
    research_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl ScriptedResearcher {
    pub fn new(text: &str) -> Self {
        Self {
            model: Model::O3Mini,
            text: text.to_string(),
            fail_from_call: None,
            usage: None,
            delay: None,
            research_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        }
    }

    /// Succeed for the first `calls` research calls, fail afterwards.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_from_call = Some(calls);
        self
    }

    pub fn with_usage(mut self, tokens: u64) -> Self {
        self.usage = Some(tokens);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn research_calls(&self) -> usize {
        self.research_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    fn metered(&self, value: String) -> Metered<String> {
        match self.usage {
            Some(tokens) => Metered::new(value).with_usage(tokens),
            None => Metered::new(value),
        }
    }
}

#[async_trait]
impl Researcher for ScriptedResearcher {
    fn model(&self) -> Model {
        self.model.clone()
    }

    async fn run_research(&self, _question: &Question) -> Result<Metered<String>, ProviderError> {
        let call = self.research_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(limit) = self.fail_from_call
            && call >= limit
        {
            return Err(ProviderError::RequestFailed(format!(
                "research call {} failed",
                call + 1
            )));
        }
        Ok(self.metered(self.text.clone()))
    }

    async fn summarize_research(
        &self,
        _question: &Question,
        research: &str,
    ) -> Result<Metered<String>, ProviderError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metered(format!("summary of {}", research)))
    }
}

pub struct ScriptedPredictor {
    model: Model,
    probabilities: Vec<f64>,
    value: Option<PredictionValue>,
    fail_even_calls: bool,
    always_fail: bool,
    calls: AtomicUsize,
    seen_research: Mutex<Vec<String>>,
}

impl ScriptedPredictor {
    /// Binary predictor answering `probability` on every call
    pub fn constant(probability: f64) -> Self {
        Self::sequence(vec![probability])
    }

    /// Binary predictor answering `probabilities[(n - 1) % len]` on call `n`
    pub fn sequence(probabilities: Vec<f64>) -> Self {
        Self {
            model: Model::O3Mini,
            probabilities,
            value: None,
            fail_even_calls: false,
            always_fail: false,
            calls: AtomicUsize::new(0),
            seen_research: Mutex::new(Vec::new()),
        }
    }

    pub fn with_value(value: PredictionValue) -> Self {
        let mut predictor = Self::constant(0.5);
        predictor.value = Some(value);
        predictor
    }

    /// Fail the 2nd, 4th, ... call
    pub fn failing_even_calls(mut self) -> Self {
        self.fail_even_calls = true;
        self
    }

    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_research(&self) -> Vec<String> {
        self.seen_research.lock().unwrap().clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    fn model(&self) -> Model {
        self.model.clone()
    }

    async fn predict(
        &self,
        _question: &Question,
        research: &str,
    ) -> Result<Metered<ReasonedPrediction>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen_research.lock().unwrap().push(research.to_string());

        if self.always_fail || (self.fail_even_calls && call % 2 == 0) {
            return Err(ProviderError::RequestFailed(format!(
                "prediction call {} failed",
                call
            )));
        }

        let value = match &self.value {
            Some(value) => value.clone(),
            None => PredictionValue::Binary(
                self.probabilities[(call - 1) % self.probabilities.len()],
            ),
        };
        Ok(Metered::new(ReasonedPrediction::new(
            value,
            format!("call {}", call),
        )))
    }
}
