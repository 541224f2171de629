//! Bot tunables from TOML (`[bot]` section)

use forecast_application::BotConfig;
use forecast_domain::{AggregationMethod, ConfigIssue, ConfigIssueCode, RunType, lookup_key};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw bot configuration from TOML
///
/// # Example
///
/// ```toml
/// [bot]
/// research_reports_per_question = 2
/// predictions_per_research_report = 3
/// use_research_summary_to_forecast = true
/// skip_previously_forecasted_questions = true
/// folder_to_save_reports_to = "reports"
/// aggregation = "median"          # mean, median, trimmed_mean
/// run_type = "regular_forecast"   # regular_forecast, unit_test, benchmark
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBotConfig {
    pub research_reports_per_question: usize,
    pub predictions_per_research_report: usize,
    pub use_research_summary_to_forecast: bool,
    pub skip_previously_forecasted_questions: bool,
    pub folder_to_save_reports_to: Option<String>,
    pub aggregation: String,
    pub run_type: String,
}

impl Default for FileBotConfig {
    fn default() -> Self {
        let defaults = BotConfig::default();
        Self {
            research_reports_per_question: defaults.research_reports_per_question,
            predictions_per_research_report: defaults.predictions_per_research_report,
            use_research_summary_to_forecast: defaults.use_research_summary_to_forecast,
            skip_previously_forecasted_questions: defaults.skip_previously_forecasted_questions,
            folder_to_save_reports_to: None,
            aggregation: defaults.aggregation.as_str().to_string(),
            run_type: defaults.run_type.as_str().to_string(),
        }
    }
}

fn invalid_enum(field: &str, value: &str, fallback: &str) -> ConfigIssue {
    let valid_values = lookup_key(field)
        .map(|info| info.valid_values.iter().map(|v| v.to_string()).collect())
        .unwrap_or_default();
    ConfigIssue::warning(
        ConfigIssueCode::InvalidEnumValue {
            field: format!("bot.{}", field),
            value: value.to_string(),
            valid_values,
        },
        format!(
            "bot.{}: unknown value '{}', falling back to '{}'",
            field, value, fallback
        ),
    )
}

impl FileBotConfig {
    /// Convert into [`BotConfig`], collecting issues instead of failing.
    pub fn to_bot_config(&self) -> (BotConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = BotConfig::default();

        let aggregation = self
            .aggregation
            .parse::<AggregationMethod>()
            .unwrap_or_else(|_| {
                issues.push(invalid_enum(
                    "aggregation",
                    &self.aggregation,
                    defaults.aggregation.as_str(),
                ));
                defaults.aggregation
            });
        let run_type = self.run_type.parse::<RunType>().unwrap_or_else(|_| {
            issues.push(invalid_enum(
                "run_type",
                &self.run_type,
                defaults.run_type.as_str(),
            ));
            defaults.run_type
        });

        let mut config = BotConfig::default()
            .with_research_reports_per_question(self.research_reports_per_question)
            .with_predictions_per_research_report(self.predictions_per_research_report)
            .with_research_summary(self.use_research_summary_to_forecast)
            .with_skip_previously_forecasted(self.skip_previously_forecasted_questions)
            .with_aggregation(aggregation)
            .with_run_type(run_type);
        config.folder_to_save_reports_to = self
            .folder_to_save_reports_to
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(PathBuf::from);

        issues.extend(config.validate());
        (config, issues)
    }
}
