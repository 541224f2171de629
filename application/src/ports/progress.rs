//! Progress notification port
//!
//! Defines the interface for reporting progress while questions are
//! forecast.

use forecast_domain::{PipelineStage, Question};

/// Callback for progress updates during a forecasting batch
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain logs, ...).
pub trait ForecastProgressNotifier: Send + Sync {
    /// Called once before any question of a batch is started
    fn on_batch_start(&self, _total_questions: usize) {}

    /// Called when a question enters a new pipeline stage
    fn on_stage(&self, question: &Question, stage: PipelineStage, total_tasks: usize);

    /// Called when a research or prediction task of a question finishes
    fn on_task_complete(&self, question: &Question, stage: PipelineStage, success: bool);

    /// Called once after every question of a batch has finished
    fn on_batch_complete(&self, _succeeded: usize, _failed: usize) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ForecastProgressNotifier for NoProgress {
    fn on_stage(&self, _question: &Question, _stage: PipelineStage, _total_tasks: usize) {}
    fn on_task_complete(&self, _question: &Question, _stage: PipelineStage, _success: bool) {}
}
