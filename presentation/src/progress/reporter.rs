//! Progress reporting for forecasting batches

use colored::Colorize;
use forecast_application::ForecastProgressNotifier;
use forecast_domain::{PipelineStage, Question, QuestionId, preview};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Reports progress with one bar per question plus an overall batch bar
pub struct ProgressReporter {
    multi: MultiProgress,
    batch_bar: Mutex<Option<ProgressBar>>,
    question_bars: Mutex<HashMap<QuestionId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// Reporter that draws nowhere (tests, non-tty output)
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            batch_bar: Mutex::new(None),
            question_bars: Mutex::new(HashMap::new()),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn batch_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.green/white}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<QuestionId, ProgressBar>> {
        self.question_bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn batch(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.batch_bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prefix(question: &Question, stage: PipelineStage) -> String {
        format!("Q{} {}", question.id(), stage.display_name())
    }

    fn advance_batch(&self, message: String) {
        if let Some(pb) = self.batch().as_ref() {
            pb.set_message(message);
            pb.inc(1);
        }
    }

    /// Current position of a question's bar, if one is active
    pub fn question_position(&self, id: QuestionId) -> Option<(u64, Option<u64>)> {
        self.bars().get(&id).map(|pb| (pb.position(), pb.length()))
    }

    /// Current position of the batch bar, if a batch is running
    pub fn batch_position(&self) -> Option<u64> {
        self.batch().as_ref().map(|pb| pb.position())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastProgressNotifier for ProgressReporter {
    fn on_batch_start(&self, total_questions: usize) {
        let pb = self.multi.add(ProgressBar::new(total_questions as u64));
        pb.set_style(Self::batch_style());
        pb.set_prefix("Questions");
        *self.batch() = Some(pb);
    }

    fn on_stage(&self, question: &Question, stage: PipelineStage, total_tasks: usize) {
        let mut bars = self.bars();
        match stage {
            PipelineStage::Pending => {}
            PipelineStage::Researching | PipelineStage::Predicting => {
                let pb = bars
                    .entry(question.id())
                    .or_insert_with(|| {
                        let pb = self.multi.add(ProgressBar::new(0));
                        pb.set_style(Self::stage_style());
                        pb
                    });
                pb.set_length(total_tasks as u64);
                pb.set_position(0);
                pb.set_prefix(Self::prefix(question, stage));
                pb.set_message(preview(question.text(), 40));
            }
            PipelineStage::Aggregating => {
                if let Some(pb) = bars.get(&question.id()) {
                    pb.set_prefix(Self::prefix(question, stage));
                }
            }
            PipelineStage::Done => {
                if let Some(pb) = bars.remove(&question.id()) {
                    pb.finish_with_message(format!("{}", "done".green()));
                }
                drop(bars);
                self.advance_batch(format!("{} Q{}", "v".green(), question.id()));
            }
            PipelineStage::Failed => {
                if let Some(pb) = bars.remove(&question.id()) {
                    pb.abandon_with_message(format!("{}", "failed".red()));
                }
                drop(bars);
                self.advance_batch(format!("{} Q{}", "x".red(), question.id()));
            }
        }
    }

    fn on_task_complete(&self, question: &Question, _stage: PipelineStage, success: bool) {
        if let Some(pb) = self.bars().get(&question.id()) {
            if !success {
                pb.set_message(format!("{}", "task failed".yellow()));
            }
            pb.inc(1);
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        if let Some(pb) = self.batch().take() {
            pb.finish_with_message(format!(
                "{} succeeded, {} failed",
                succeeded.to_string().green(),
                failed.to_string().red()
            ));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ForecastProgressNotifier for SimpleProgress {
    fn on_batch_start(&self, total_questions: usize) {
        println!(
            "{} {} ({} questions)",
            "->".cyan(),
            "Forecasting".bold(),
            total_questions
        );
    }

    fn on_stage(&self, question: &Question, stage: PipelineStage, total_tasks: usize) {
        match stage {
            PipelineStage::Researching | PipelineStage::Predicting => println!(
                "{} Q{} {} ({} tasks)",
                "->".cyan(),
                question.id(),
                stage.display_name().bold(),
                total_tasks
            ),
            PipelineStage::Done => println!("  {} Q{} done", "v".green(), question.id()),
            PipelineStage::Failed => println!("  {} Q{} failed", "x".red(), question.id()),
            PipelineStage::Pending | PipelineStage::Aggregating => {}
        }
    }

    fn on_task_complete(&self, question: &Question, stage: PipelineStage, success: bool) {
        if !success {
            println!(
                "  {} Q{} {} task failed",
                "!".yellow(),
                question.id(),
                stage.display_name()
            );
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        println!("{} succeeded, {} failed", succeeded, failed);
    }
}
