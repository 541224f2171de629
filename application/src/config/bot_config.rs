//! Bot tunables: pipeline shape, skip gate, aggregation and persistence.
//!
//! [`BotConfig`] groups the static parameters read by
//! [`ForecastQuestionUseCase`](crate::use_cases::forecast_question::ForecastQuestionUseCase)
//! and [`ForecastBatchUseCase`](crate::use_cases::forecast_questions::ForecastBatchUseCase).

use super::config_value::ConfigValue;
use forecast_domain::{AggregationMethod, ConfigIssue, ConfigIssueCode, RunType};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Independent research passes per question (R).
    pub research_reports_per_question: usize,
    /// Prediction attempts per successful research pass (P).
    pub predictions_per_research_report: usize,
    /// Hand the research summary to prediction instead of the full text.
    pub use_research_summary_to_forecast: bool,
    /// Leave out questions the source marks as already forecasted.
    pub skip_previously_forecasted_questions: bool,
    /// Folder receiving one artifact per batch. `None` disables saving.
    pub folder_to_save_reports_to: Option<PathBuf>,
    /// Statistic combining successful predictions.
    pub aggregation: AggregationMethod,
    /// Tag attached to persisted batches.
    pub run_type: RunType,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            research_reports_per_question: 1,
            predictions_per_research_report: 1,
            use_research_summary_to_forecast: false,
            skip_previously_forecasted_questions: false,
            folder_to_save_reports_to: None,
            aggregation: AggregationMethod::default(),
            run_type: RunType::default(),
        }
    }
}

impl BotConfig {
    // ==================== Builder Methods ====================

    pub fn with_research_reports_per_question(mut self, count: usize) -> Self {
        self.research_reports_per_question = count;
        self
    }

    pub fn with_predictions_per_research_report(mut self, count: usize) -> Self {
        self.predictions_per_research_report = count;
        self
    }

    pub fn with_research_summary(mut self, enabled: bool) -> Self {
        self.use_research_summary_to_forecast = enabled;
        self
    }

    pub fn with_skip_previously_forecasted(mut self, enabled: bool) -> Self {
        self.skip_previously_forecasted_questions = enabled;
        self
    }

    pub fn with_save_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder_to_save_reports_to = Some(folder.into());
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationMethod) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_run_type(mut self, run_type: RunType) -> Self {
        self.run_type = run_type;
        self
    }

    /// Pipelines need at least one research pass and one prediction per pass.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (field, value) in [
            (
                "research_reports_per_question",
                self.research_reports_per_question,
            ),
            (
                "predictions_per_research_report",
                self.predictions_per_research_report,
            ),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidConstraint {
                        field: field.to_string(),
                    },
                    format!("{} must be at least 1", field),
                ));
            }
        }
        issues
    }

    /// Flat view of every tunable, keyed as in the config key registry.
    pub fn get_config(&self) -> BTreeMap<String, ConfigValue> {
        let mut map = BTreeMap::new();
        map.insert(
            "research_reports_per_question".to_string(),
            ConfigValue::Integer(self.research_reports_per_question as i64),
        );
        map.insert(
            "predictions_per_research_report".to_string(),
            ConfigValue::Integer(self.predictions_per_research_report as i64),
        );
        map.insert(
            "use_research_summary_to_forecast".to_string(),
            ConfigValue::Boolean(self.use_research_summary_to_forecast),
        );
        map.insert(
            "skip_previously_forecasted_questions".to_string(),
            ConfigValue::Boolean(self.skip_previously_forecasted_questions),
        );
        map.insert(
            "folder_to_save_reports_to".to_string(),
            self.folder_to_save_reports_to
                .as_ref()
                .map(|p| ConfigValue::String(p.display().to_string()))
                .unwrap_or(ConfigValue::Unset),
        );
        map.insert(
            "aggregation".to_string(),
            ConfigValue::String(self.aggregation.as_str().to_string()),
        );
        map.insert(
            "run_type".to_string(),
            ConfigValue::String(self.run_type.as_str().to_string()),
        );
        map
    }
}
