//! Output formatter trait

use forecast_domain::{ForecastReport, OutputFormat};

/// Trait for formatting forecast reports
pub trait OutputFormatter {
    /// Format every report with research, predictions and errors
    fn format(&self, reports: &[ForecastReport]) -> String;

    /// Format as JSON
    fn format_json(&self, reports: &[ForecastReport]) -> String;

    /// One line per question (concise output)
    fn format_summary(&self, reports: &[ForecastReport]) -> String;

    /// Dispatch on the requested format
    fn render(&self, reports: &[ForecastReport], format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => self.format(reports),
            OutputFormat::Summary => self.format_summary(reports),
            OutputFormat::Json => self.format_json(reports),
        }
    }
}
