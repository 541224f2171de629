//! Forecast Questions use case
//!
//! Runs one pipeline per question concurrently, applies the skip gate,
//! and hands the successful reports to the report store in one save.

use crate::ports::event_logger::ForecastEvent;
use crate::ports::progress::{ForecastProgressNotifier, NoProgress};
use crate::ports::report_store::ReportStore;
use crate::use_cases::forecast_question::{ForecastError, ForecastQuestionUseCase};
use forecast_domain::{ForecastReport, Question, QuestionId};
use futures::future::join_all;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one question in a batch
pub type QuestionOutcome = Result<ForecastReport, ForecastError>;

/// Per-question outcomes of a batch, in input order
///
/// Questions removed by the skip gate have no slot; their ids are listed
/// in [`BatchResult::skipped`].
#[derive(Debug)]
pub struct BatchResult {
    outcomes: Vec<QuestionOutcome>,
    skipped: Vec<QuestionId>,
    saved_to: Option<PathBuf>,
}

impl BatchResult {
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<QuestionOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn reports(&self) -> impl Iterator<Item = &ForecastReport> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ForecastError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    /// Questions left out because they were already forecasted
    pub fn skipped(&self) -> &[QuestionId] {
        &self.skipped
    }

    /// Artifact written for this batch, if any
    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }
}

/// Run-level counts of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub questions: usize,
    pub reports: usize,
    pub failures: usize,
    /// Tolerated errors across all reports
    pub tolerated_errors: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn has_problems(&self) -> bool {
        self.failures > 0 || self.tolerated_errors > 0
    }
}

impl From<&BatchResult> for BatchSummary {
    fn from(result: &BatchResult) -> Self {
        Self {
            questions: result.len(),
            reports: result.reports().count(),
            failures: result.failures().count(),
            tolerated_errors: result.reports().map(|r| r.errors().len()).sum(),
            skipped: result.skipped().len(),
        }
    }
}

/// Use case for forecasting a batch of questions
pub struct ForecastBatchUseCase {
    pipeline: ForecastQuestionUseCase,
    store: Arc<dyn ReportStore>,
}

impl ForecastBatchUseCase {
    pub fn new(pipeline: ForecastQuestionUseCase, store: Arc<dyn ReportStore>) -> Self {
        Self { pipeline, store }
    }

    pub fn pipeline(&self) -> &ForecastQuestionUseCase {
        &self.pipeline
    }

    /// Forecast every question with default (no-op) progress
    ///
    /// With `return_exceptions` each fatal failure is kept in its slot;
    /// without it the first failure in input order is returned once every
    /// pipeline has finished, and nothing is saved.
    pub async fn forecast_questions(
        &self,
        questions: Vec<Question>,
        return_exceptions: bool,
    ) -> Result<BatchResult, ForecastError> {
        self.forecast_questions_with_progress(questions, return_exceptions, &NoProgress)
            .await
    }

    pub async fn forecast_questions_with_progress(
        &self,
        questions: Vec<Question>,
        return_exceptions: bool,
        progress: &dyn ForecastProgressNotifier,
    ) -> Result<BatchResult, ForecastError> {
        let config = self.pipeline.config();

        let (skipped, questions): (Vec<Question>, Vec<Question>) = questions
            .into_iter()
            .partition(|q| config.skip_previously_forecasted_questions && q.already_forecasted());
        let skipped: Vec<QuestionId> = skipped.iter().map(Question::id).collect();
        if !skipped.is_empty() {
            info!(
                "Skipping {} previously forecasted question(s): {:?}",
                skipped.len(),
                skipped
            );
        }

        info!("Forecasting {} question(s)", questions.len());
        progress.on_batch_start(questions.len());

        let outcomes: Vec<QuestionOutcome> = join_all(
            questions
                .iter()
                .map(|q| self.pipeline.execute_with_progress(q, progress)),
        )
        .await;

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        progress.on_batch_complete(succeeded, outcomes.len() - succeeded);
        self.log_problems(&outcomes);

        if !return_exceptions
            && let Some(err) = outcomes.iter().find_map(|o| o.as_ref().err())
        {
            error!("Batch aborted: {}", err);
            return Err(err.clone());
        }

        let reports: Vec<ForecastReport> = outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .cloned()
            .collect();
        let saved_to = self.save(&reports).await;

        Ok(BatchResult {
            outcomes,
            skipped,
            saved_to,
        })
    }

    /// Forecast one question through the same pipeline and persistence
    ///
    /// Unlike the batch, an already-forecasted question with the skip gate
    /// enabled is an error here.
    pub async fn forecast_question(
        &self,
        question: Question,
    ) -> Result<ForecastReport, ForecastError> {
        if self.pipeline.config().skip_previously_forecasted_questions
            && question.already_forecasted()
        {
            return Err(ForecastError::PreconditionViolation {
                question_id: question.id(),
            });
        }

        let result = self.forecast_questions(vec![question], true).await?;
        match result.into_outcomes().pop() {
            Some(outcome) => outcome,
            None => Err(ForecastError::InvalidConfig(
                "question produced no outcome".to_string(),
            )),
        }
    }

    async fn save(&self, reports: &[ForecastReport]) -> Option<PathBuf> {
        let config = self.pipeline.config();
        let folder = config.folder_to_save_reports_to.as_deref()?;
        if reports.is_empty() {
            info!("No successful reports, nothing saved");
            return None;
        }

        match self
            .store
            .save_reports(reports, config.run_type, Some(folder))
            .await
        {
            Ok(Some(path)) => {
                info!("Saved {} report(s) to {}", reports.len(), path.display());
                self.pipeline.event_logger().log(ForecastEvent::new(
                    "reports_saved",
                    json!({
                        "path": path.display().to_string(),
                        "reports": reports.len(),
                        "run_type": config.run_type.as_str(),
                    }),
                ));
                Some(path)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to save reports to {}: {}", folder.display(), e);
                self.pipeline.event_logger().log(ForecastEvent::new(
                    "reports_save_failed",
                    json!({ "folder": folder.display().to_string(), "error": e.to_string() }),
                ));
                None
            }
        }
    }

    fn log_problems(&self, outcomes: &[QuestionOutcome]) {
        for outcome in outcomes {
            match outcome {
                Ok(report) if report.has_errors() => {
                    warn!(
                        "Question {} completed with {} tolerated error(s)",
                        report.question().id(),
                        report.errors().len()
                    );
                    for e in report.errors() {
                        warn!("  {}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("{}", e),
            }
        }
    }
}
