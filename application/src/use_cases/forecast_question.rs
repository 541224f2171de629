//! Forecast Question use case
//!
//! Runs one question through the pipeline:
//! research passes, predictions per successful research, aggregation.
//!
//! ```text
//! Pending → Researching → Predicting → Aggregating → Done
//!                                                  ↘ Failed
//! ```
//!
//! Sub-task failures are tolerated and kept on the report. The question
//! only fails when no prediction succeeds, when aggregation fails, or when
//! its precondition does not hold.

use crate::config::BotConfig;
use crate::ports::event_logger::{ForecastEvent, ForecastEventLogger, NoEventLogger};
use crate::ports::prediction::Predictor;
use crate::ports::progress::{ForecastProgressNotifier, NoProgress};
use crate::ports::research::Researcher;
use crate::quota::QuotaRegistry;
use crate::use_cases::prediction_unit::{PredictionError, PredictionUnit};
use crate::use_cases::research_unit::{ResearchError, ResearchUnit};
use forecast_domain::{
    Aggregator, DomainError, ForecastReport, PipelineStage, Question, QuestionId,
    ReasonedPrediction, ReportError, ResearchRecord,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Fatal failures of a question pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error(
        "Question {question_id} is already forecasted and skipping previously forecasted questions is enabled"
    )]
    PreconditionViolation { question_id: QuestionId },

    #[error("Invalid bot configuration: {0}")]
    InvalidConfig(String),

    #[error("Forecasting question {question_id} failed: {}", last_message(.errors))]
    PipelineFailure {
        question_id: QuestionId,
        /// Every tolerated failure, in encounter order
        errors: Vec<ReportError>,
    },

    #[error("Aggregation for question {question_id} failed: {source}")]
    Aggregation {
        question_id: QuestionId,
        #[source]
        source: DomainError,
    },
}

fn last_message(errors: &[ReportError]) -> String {
    errors
        .last()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no prediction succeeded".to_string())
}

impl ForecastError {
    /// Most diagnostic underlying failure (the last one encountered)
    pub fn last_error(&self) -> Option<&ReportError> {
        match self {
            ForecastError::PipelineFailure { errors, .. } => errors.last(),
            _ => None,
        }
    }

    pub fn question_id(&self) -> Option<QuestionId> {
        match self {
            ForecastError::PreconditionViolation { question_id }
            | ForecastError::PipelineFailure { question_id, .. }
            | ForecastError::Aggregation { question_id, .. } => Some(*question_id),
            ForecastError::InvalidConfig(_) => None,
        }
    }
}

/// Tracks one question's stage and reports every transition.
struct StageTracker<'a> {
    question: &'a Question,
    stage: PipelineStage,
    progress: &'a dyn ForecastProgressNotifier,
    logger: &'a dyn ForecastEventLogger,
}

impl<'a> StageTracker<'a> {
    fn new(
        question: &'a Question,
        progress: &'a dyn ForecastProgressNotifier,
        logger: &'a dyn ForecastEventLogger,
    ) -> Self {
        Self {
            question,
            stage: PipelineStage::Pending,
            progress,
            logger,
        }
    }

    fn advance(&mut self, next: PipelineStage, total_tasks: usize) {
        if !self.stage.can_transition_to(next) {
            warn!(
                "Question {}: unexpected transition {} -> {}",
                self.question.id(),
                self.stage,
                next
            );
        }
        debug!("Question {}: {} -> {}", self.question.id(), self.stage, next);
        self.stage = next;
        self.progress.on_stage(self.question, next, total_tasks);
        self.logger.log(ForecastEvent::new(
            "stage_changed",
            json!({
                "question_id": self.question.id(),
                "stage": next.as_str(),
                "tasks": total_tasks,
            }),
        ));
    }
}

/// Use case for forecasting a single question
///
/// Cheap to clone: every collaborator is shared.
#[derive(Clone)]
pub struct ForecastQuestionUseCase {
    research_unit: ResearchUnit,
    prediction_unit: PredictionUnit,
    aggregator: Arc<dyn Aggregator>,
    config: Arc<BotConfig>,
    event_logger: Arc<dyn ForecastEventLogger>,
}

impl ForecastQuestionUseCase {
    pub fn new(
        researcher: Arc<dyn Researcher>,
        predictor: Arc<dyn Predictor>,
        quotas: Arc<QuotaRegistry>,
        config: BotConfig,
    ) -> Self {
        let research_unit = ResearchUnit::new(researcher, Arc::clone(&quotas))
            .with_summary(config.use_research_summary_to_forecast);
        let prediction_unit = PredictionUnit::new(predictor, quotas);
        Self {
            research_unit,
            prediction_unit,
            aggregator: Arc::new(config.aggregation),
            config: Arc::new(config),
            event_logger: Arc::new(NoEventLogger),
        }
    }

    /// Replace the configured aggregation method with a custom policy
    pub fn with_aggregator(mut self, aggregator: Arc<dyn Aggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn ForecastEventLogger>) -> Self {
        self.event_logger = logger;
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub(crate) fn event_logger(&self) -> &dyn ForecastEventLogger {
        self.event_logger.as_ref()
    }

    /// Execute the pipeline with default (no-op) progress
    pub async fn execute(&self, question: &Question) -> Result<ForecastReport, ForecastError> {
        self.execute_with_progress(question, &NoProgress).await
    }

    /// Execute the pipeline with progress callbacks
    pub async fn execute_with_progress(
        &self,
        question: &Question,
        progress: &dyn ForecastProgressNotifier,
    ) -> Result<ForecastReport, ForecastError> {
        if self.config.skip_previously_forecasted_questions && question.already_forecasted() {
            return Err(ForecastError::PreconditionViolation {
                question_id: question.id(),
            });
        }
        if let Some(issue) = self.config.validate().into_iter().find(|i| i.is_error()) {
            return Err(ForecastError::InvalidConfig(issue.message));
        }

        info!("Forecasting question {}", question);
        let mut tracker = StageTracker::new(question, progress, self.event_logger.as_ref());
        let mut errors = Vec::new();

        // Phase 1: Research
        tracker.advance(
            PipelineStage::Researching,
            self.config.research_reports_per_question,
        );
        let research = self.phase_research(question, progress, &mut errors).await;

        // Phase 2: Predictions
        let predictions = if research.is_empty() {
            warn!("Question {}: every research pass failed", question.id());
            Vec::new()
        } else {
            tracker.advance(
                PipelineStage::Predicting,
                research.len() * self.config.predictions_per_research_report,
            );
            self.phase_predict(question, &research, progress, &mut errors)
                .await
        };

        if predictions.is_empty() {
            tracker.advance(PipelineStage::Failed, 0);
            let err = ForecastError::PipelineFailure {
                question_id: question.id(),
                errors,
            };
            error!("{}", err);
            self.event_logger.log(ForecastEvent::new(
                "forecast_failed",
                json!({ "question_id": question.id(), "error": err.to_string() }),
            ));
            return Err(err);
        }

        // Phase 3: Aggregation
        tracker.advance(PipelineStage::Aggregating, predictions.len());
        let report = match ForecastReport::aggregate(
            question.clone(),
            research,
            predictions,
            errors,
            self.aggregator.as_ref(),
        ) {
            Ok(report) => report,
            Err(source) => {
                tracker.advance(PipelineStage::Failed, 0);
                let err = ForecastError::Aggregation {
                    question_id: question.id(),
                    source,
                };
                error!("{}", err);
                return Err(err);
            }
        };

        tracker.advance(PipelineStage::Done, 0);
        info!(
            "Question {}: {} ({} predictions, {} tolerated errors)",
            question.id(),
            report.prediction(),
            report.predictions().len(),
            report.errors().len()
        );
        self.event_logger.log(ForecastEvent::new(
            "forecast_complete",
            json!({
                "question_id": question.id(),
                "prediction": report.prediction(),
                "predictions": report.predictions().len(),
                "errors": report.errors().len(),
                "aggregation": report.aggregation(),
            }),
        ));
        Ok(report)
    }

    /// Run R research units concurrently
    async fn phase_research(
        &self,
        question: &Question,
        progress: &dyn ForecastProgressNotifier,
        errors: &mut Vec<ReportError>,
    ) -> Vec<ResearchRecord> {
        let mut join_set = JoinSet::new();
        for _ in 0..self.config.research_reports_per_question {
            let unit = self.research_unit.clone();
            let question = question.clone();
            join_set.spawn(async move { unit.run(&question).await });
        }

        let mut records = Vec::new();
        while let Some(result) = join_set.join_next().await {
            let result = result.unwrap_or_else(|e| Err(ResearchError::Aborted(e.to_string())));
            match result {
                Ok(record) => {
                    progress.on_task_complete(question, PipelineStage::Researching, true);
                    records.push(record);
                }
                Err(e) => {
                    warn!("Question {}: research failed: {}", question.id(), e);
                    progress.on_task_complete(question, PipelineStage::Researching, false);
                    errors.push(e.to_report_error());
                }
            }
        }

        self.event_logger.log(ForecastEvent::new(
            "research_complete",
            json!({
                "question_id": question.id(),
                "succeeded": records.len(),
                "failed": self.config.research_reports_per_question - records.len(),
            }),
        ));
        records
    }

    /// Run P prediction units per successful research concurrently
    async fn phase_predict(
        &self,
        question: &Question,
        research: &[ResearchRecord],
        progress: &dyn ForecastProgressNotifier,
        errors: &mut Vec<ReportError>,
    ) -> Vec<ReasonedPrediction> {
        let mut join_set = JoinSet::new();
        for record in research {
            for _ in 0..self.config.predictions_per_research_report {
                let unit = self.prediction_unit.clone();
                let question = question.clone();
                let input = record.forecast_input().to_string();
                join_set.spawn(async move { unit.run(&question, &input).await });
            }
        }
        let attempted = join_set.len();

        let mut predictions = Vec::new();
        while let Some(result) = join_set.join_next().await {
            let result = result.unwrap_or_else(|e| Err(PredictionError::Aborted(e.to_string())));
            match result {
                Ok(prediction) => {
                    progress.on_task_complete(question, PipelineStage::Predicting, true);
                    predictions.push(prediction);
                }
                Err(e) => {
                    warn!("Question {}: prediction failed: {}", question.id(), e);
                    progress.on_task_complete(question, PipelineStage::Predicting, false);
                    errors.push(e.to_report_error());
                }
            }
        }

        self.event_logger.log(ForecastEvent::new(
            "predictions_complete",
            json!({
                "question_id": question.id(),
                "attempted": attempted,
                "succeeded": predictions.len(),
            }),
        ));
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{ScriptedPredictor, ScriptedResearcher};
    use forecast_domain::{AggregationMethod, FailureKind, Percentile, PredictionValue};
    use std::sync::Mutex;

    fn question() -> Question {
        Question::binary(42, "Will it rain tomorrow?").unwrap()
    }

    fn use_case(
        researcher: Arc<ScriptedResearcher>,
        predictor: Arc<ScriptedPredictor>,
        config: BotConfig,
    ) -> ForecastQuestionUseCase {
        ForecastQuestionUseCase::new(researcher, predictor, Arc::new(QuotaRegistry::new()), config)
    }

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<PipelineStage>>,
        tasks: Mutex<Vec<(PipelineStage, bool)>>,
    }

    impl ForecastProgressNotifier for RecordingProgress {
        fn on_stage(&self, _question: &Question, stage: PipelineStage, _total_tasks: usize) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_task_complete(&self, _question: &Question, stage: PipelineStage, success: bool) {
            self.tasks.lock().unwrap().push((stage, success));
        }
    }

    #[tokio::test]
    async fn test_invocation_counts_follow_research_and_prediction_fanout() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.3));
        let config = BotConfig::default()
            .with_research_reports_per_question(3)
            .with_predictions_per_research_report(4);

        let report = use_case(researcher.clone(), predictor.clone(), config)
            .execute(&question())
            .await
            .unwrap();

        assert_eq!(researcher.research_calls(), 3);
        assert_eq!(predictor.calls(), 12);
        assert_eq!(report.research().len(), 3);
        assert_eq!(report.predictions().len(), 12);
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn test_failed_research_gets_no_predictions() {
        let researcher = Arc::new(ScriptedResearcher::new("research").failing_after(1));
        let predictor = Arc::new(ScriptedPredictor::constant(0.3));
        let config = BotConfig::default()
            .with_research_reports_per_question(3)
            .with_predictions_per_research_report(2);

        let report = use_case(researcher.clone(), predictor.clone(), config)
            .execute(&question())
            .await
            .unwrap();

        assert_eq!(researcher.research_calls(), 3);
        assert_eq!(predictor.calls(), 2);
        assert_eq!(report.errors().len(), 2);
        assert!(
            report
                .errors()
                .iter()
                .all(|e| e.kind == FailureKind::ResearchError)
        );
    }

    #[tokio::test]
    async fn test_half_failing_predictions_aggregate_successes_only() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        // Calls 1, 3, 5 succeed with 0.1, 0.3, 0.5; even calls fail.
        let predictor = Arc::new(
            ScriptedPredictor::sequence(vec![0.1, 0.9, 0.3, 0.9, 0.5, 0.9]).failing_even_calls(),
        );
        let config = BotConfig::default()
            .with_predictions_per_research_report(6)
            .with_aggregation(AggregationMethod::Median);

        let report = use_case(researcher, predictor.clone(), config)
            .execute(&question())
            .await
            .unwrap();

        assert_eq!(predictor.calls(), 6);
        assert_eq!(report.predictions().len(), 3);
        assert_eq!(report.errors().len(), 3);
        assert!(
            report
                .errors()
                .iter()
                .all(|e| e.kind == FailureKind::PredictionError && e.cause == "RequestFailed")
        );
        assert_eq!(report.prediction().as_probability(), Some(0.3));
    }

    #[tokio::test]
    async fn test_all_predictions_failing_fails_question() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5).always_failing());
        let config = BotConfig::default().with_predictions_per_research_report(3);

        let err = use_case(researcher, predictor, config)
            .execute(&question())
            .await
            .unwrap_err();

        match &err {
            ForecastError::PipelineFailure {
                question_id,
                errors,
            } => {
                assert_eq!(*question_id, 42);
                assert_eq!(errors.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let last = err.last_error().unwrap();
        assert!(err.to_string().contains(&last.message));
    }

    #[tokio::test]
    async fn test_all_research_failing_fails_question() {
        let researcher = Arc::new(ScriptedResearcher::new("research").failing_after(0));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5));
        let progress = RecordingProgress::default();

        let err = use_case(researcher, predictor.clone(), BotConfig::default())
            .execute_with_progress(&question(), &progress)
            .await
            .unwrap_err();

        assert_eq!(predictor.calls(), 0);
        assert_eq!(err.last_error().unwrap().kind, FailureKind::ResearchError);
        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec![PipelineStage::Researching, PipelineStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_summary_mode_forecasts_from_summary() {
        let researcher = Arc::new(ScriptedResearcher::new("full text"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5));
        let config = BotConfig::default().with_research_summary(true);

        let report = use_case(researcher.clone(), predictor.clone(), config)
            .execute(&question())
            .await
            .unwrap();

        assert_eq!(researcher.summary_calls(), 1);
        assert_eq!(predictor.seen_research(), vec!["summary of full text"]);
        assert_eq!(report.research()[0].research, "full text");
    }

    #[tokio::test]
    async fn test_skip_gate_precondition() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5));
        let config = BotConfig::default().with_skip_previously_forecasted(true);
        let question = question().with_already_forecasted(true);

        let err = use_case(researcher.clone(), predictor, config)
            .execute(&question)
            .await
            .unwrap_err();

        assert_eq!(err, ForecastError::PreconditionViolation { question_id: 42 });
        assert_eq!(researcher.research_calls(), 0);
    }

    #[tokio::test]
    async fn test_already_forecasted_runs_when_skip_gate_disabled() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5));
        let question = question().with_already_forecasted(true);

        let report = use_case(researcher, predictor, BotConfig::default())
            .execute(&question)
            .await;

        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn test_zero_research_passes_rejected() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5));
        let config = BotConfig::default().with_research_reports_per_question(0);

        let err = use_case(researcher, predictor, config)
            .execute(&question())
            .await
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_mismatched_percentile_grids_fail_aggregation() {
        let question = Question::numeric(5, "How many?", 0.0, 100.0).unwrap();
        let values = vec![
            PredictionValue::Numeric(vec![Percentile::new(0.1, 10.0), Percentile::new(0.9, 90.0)]),
            PredictionValue::Numeric(vec![Percentile::new(0.2, 20.0), Percentile::new(0.8, 80.0)]),
        ];
        let predictor = Arc::new(ScriptedPredictor::with_value(values[0].clone()));
        let researcher = Arc::new(ScriptedResearcher::new("research"));

        struct SwitchingGrids(Vec<PredictionValue>);
        impl Aggregator for SwitchingGrids {
            fn name(&self) -> String {
                "switching".to_string()
            }
            fn aggregate(
                &self,
                question: &Question,
                _values: &[PredictionValue],
            ) -> Result<PredictionValue, DomainError> {
                AggregationMethod::Mean.aggregate(question, &self.0)
            }
        }

        let err = use_case(researcher, predictor, BotConfig::default())
            .with_aggregator(Arc::new(SwitchingGrids(values)))
            .execute(&question)
            .await
            .unwrap_err();

        assert!(matches!(err, ForecastError::Aggregation { question_id: 5, .. }));
    }

    #[tokio::test]
    async fn test_progress_sees_every_stage_and_task() {
        let researcher = Arc::new(ScriptedResearcher::new("research"));
        let predictor = Arc::new(ScriptedPredictor::constant(0.5).failing_even_calls());
        let config = BotConfig::default()
            .with_research_reports_per_question(2)
            .with_predictions_per_research_report(2);
        let progress = RecordingProgress::default();

        use_case(researcher, predictor, config)
            .execute_with_progress(&question(), &progress)
            .await
            .unwrap();

        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec![
                PipelineStage::Researching,
                PipelineStage::Predicting,
                PipelineStage::Aggregating,
                PipelineStage::Done,
            ]
        );
        let tasks = progress.tasks.lock().unwrap();
        assert_eq!(tasks.len(), 6);
        assert_eq!(tasks.iter().filter(|(_, ok)| !ok).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_timeouts_are_tolerated_prediction_errors() {
        use forecast_domain::{Model, QuotaConfig};
        use std::time::Duration;

        // Research and predictions share the o3-mini gate: 2 requests per
        // 10s window, 5s admission timeout.
        let quotas = QuotaRegistry::new().with_quota(
            Model::O3Mini,
            QuotaConfig::new(2, 1_000_000, Duration::from_secs(10), Duration::from_secs(5)),
        );
        let config = BotConfig::default()
            .with_research_reports_per_question(1)
            .with_predictions_per_research_report(3);
        let use_case = ForecastQuestionUseCase::new(
            Arc::new(ScriptedResearcher::new("research")),
            Arc::new(ScriptedPredictor::constant(0.4)),
            Arc::new(quotas),
            config,
        );

        let report = use_case.execute(&question()).await.unwrap();

        assert_eq!(report.predictions().len(), 1);
        assert_eq!(report.errors().len(), 2);
        for error in report.errors() {
            assert_eq!(error.kind, FailureKind::PredictionError);
            assert_eq!(error.cause, "QuotaTimeout");
            assert_eq!(error.model.as_deref(), Some("o3-mini"));
        }
    }
}
