//! Console output formatter for forecast reports

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use forecast_application::{BatchSummary, ConfigValue};
use forecast_domain::{ConfigIssue, ForecastReport, Model, QuotaConfig, preview};
use std::collections::BTreeMap;

const RESEARCH_PREVIEW_LEN: usize = 200;
const REASONING_PREVIEW_LEN: usize = 120;

/// Formats forecast reports and run information for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format every report in full
    pub fn format(reports: &[ForecastReport]) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Forecast Reports"));
        output.push('\n');

        for report in reports {
            output.push_str(&Self::format_report(report));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format one report with its research, predictions and tolerated errors
    pub fn format_report(report: &ForecastReport) -> String {
        let mut output = String::new();
        let question = report.question();

        output.push_str(&format!(
            "\n{} {}\n",
            format!("── Question {} ({}) ──", question.id(), question.question_type())
                .yellow()
                .bold(),
            question.text()
        ));
        if let Some(url) = question.page_url() {
            output.push_str(&format!("{} {}\n", "URL:".dimmed(), url));
        }
        output.push_str(&format!(
            "{} {} {}\n",
            "Forecast:".cyan().bold(),
            report.prediction(),
            format!("({})", report.aggregation()).dimmed()
        ));

        output.push_str(&Self::section_header("Research"));
        for (i, record) in report.research().iter().enumerate() {
            output.push_str(&format!(
                "  {}. {}\n",
                i + 1,
                preview(&record.research, RESEARCH_PREVIEW_LEN)
            ));
            if let Some(summary) = &record.summary {
                output.push_str(&format!(
                    "     {} {}\n",
                    "summary:".dimmed(),
                    preview(summary, RESEARCH_PREVIEW_LEN)
                ));
            }
        }

        output.push_str(&Self::section_header("Predictions"));
        for prediction in report.predictions() {
            output.push_str(&format!(
                "  * {} {}\n",
                prediction.prediction_value.to_string().bold(),
                preview(&prediction.reasoning, REASONING_PREVIEW_LEN).dimmed()
            ));
        }

        if report.has_errors() {
            output.push_str(&format!(
                "\n{}\n",
                format!("Tolerated errors ({}):", report.errors().len())
                    .yellow()
                    .bold()
            ));
            for error in report.errors() {
                output.push_str(&format!("  {} {}\n", "!".yellow(), error));
            }
        }

        output
    }

    /// Format as JSON
    pub fn format_json(reports: &[ForecastReport]) -> String {
        serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
    }

    /// One line per question
    pub fn format_summary(reports: &[ForecastReport]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            format!("=== {} forecast(s) ===", reports.len()).cyan().bold()
        ));

        for report in reports {
            let question = report.question();
            let marker = if report.has_errors() {
                "!".yellow()
            } else {
                "v".green()
            };
            output.push_str(&format!(
                "{} {} {} {}\n",
                marker,
                format!("[{}]", question.id()).bold(),
                preview(question.text(), 60),
                format!("=> {}", report.prediction()).cyan()
            ));
        }

        output
    }

    /// Run-level counts after a batch
    pub fn format_batch_summary(summary: &BatchSummary) -> String {
        let mut output = String::new();

        output.push_str(&Self::section_header("Batch Summary"));
        output.push_str(&format!("  Questions:        {}\n", summary.questions));
        output.push_str(&format!(
            "  Reports:          {}\n",
            summary.reports.to_string().green()
        ));

        let failures = if summary.failures > 0 {
            summary.failures.to_string().red()
        } else {
            summary.failures.to_string().normal()
        };
        output.push_str(&format!("  Failures:         {}\n", failures));

        let tolerated = if summary.tolerated_errors > 0 {
            summary.tolerated_errors.to_string().yellow()
        } else {
            summary.tolerated_errors.to_string().normal()
        };
        output.push_str(&format!("  Tolerated errors: {}\n", tolerated));

        if summary.skipped > 0 {
            output.push_str(&format!(
                "  Skipped:          {}\n",
                summary.skipped.to_string().dimmed()
            ));
        }

        output
    }

    /// Resolved tunables, per-model quotas and validation issues
    pub fn format_config(
        tunables: &BTreeMap<String, ConfigValue>,
        quotas: &[(Model, QuotaConfig)],
        issues: &[ConfigIssue],
    ) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("forecast-bot configuration"));
        output.push('\n');

        output.push_str(&Self::section_header("Bot"));
        let width = tunables.keys().map(|k| k.len()).max().unwrap_or(0);
        for (key, value) in tunables {
            let rendered = match value {
                ConfigValue::Unset => value.to_string().dimmed(),
                _ => value.to_string().normal(),
            };
            output.push_str(&format!("  {:<width$}  {}\n", key, rendered, width = width));
        }

        output.push_str(&Self::section_header("Quotas"));
        output.push_str(&format!(
            "  {:<24} {:>12} {:>14} {:>10}\n",
            "model".bold(),
            "requests".bold(),
            "tokens".bold(),
            "timeout".bold()
        ));
        for (model, quota) in quotas {
            output.push_str(&format!(
                "  {:<24} {:>12} {:>14} {:>10}\n",
                model.to_string(),
                format!(
                    "{}/{}s",
                    quota.requests_per_period,
                    quota.request_period.as_secs()
                ),
                format!("{}/{}s", quota.tokens_per_period, quota.token_period.as_secs()),
                format!("{}s", quota.timeout.as_secs())
            ));
        }

        if !issues.is_empty() {
            output.push_str(&Self::section_header("Issues"));
            for issue in issues {
                let marker = if issue.is_error() {
                    "x".red()
                } else {
                    "!".yellow()
                };
                output.push_str(&format!("  {} {}\n", marker, issue));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Configuration file locations as `(label, path, found)`
    pub fn format_sources(sources: &[(String, String, bool)]) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", "Configuration sources:".cyan().bold()));
        for (label, path, found) in sources {
            let status = if *found {
                "found".green()
            } else {
                "not found".dimmed()
            };
            output.push_str(&format!("  {:<9} {} ({})\n", label, path, status));
        }

        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, reports: &[ForecastReport]) -> String {
        Self::format(reports)
    }

    fn format_json(&self, reports: &[ForecastReport]) -> String {
        Self::format_json(reports)
    }

    fn format_summary(&self, reports: &[ForecastReport]) -> String {
        Self::format_summary(reports)
    }
}
