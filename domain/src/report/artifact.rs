//! Naming of persisted report batches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every saved batch
pub const ARTIFACT_PREFIX: &str = "Forecasts-for-";

/// Why a batch of forecasts was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    RegularForecast,
    UnitTest,
    Benchmark,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::RegularForecast => "regular_forecast",
            RunType::UnitTest => "unit_test",
            RunType::Benchmark => "benchmark",
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "regular_forecast" | "regular" => Ok(RunType::RegularForecast),
            "unit_test" => Ok(RunType::UnitTest),
            "benchmark" => Ok(RunType::Benchmark),
            _ => Err(format!(
                "Unknown run type: {}. Valid: regular_forecast, unit_test, benchmark",
                s
            )),
        }
    }
}

/// `Forecasts-for-<UTC timestamp>-<N>-questions.<ext>`
pub fn artifact_file_name(timestamp: DateTime<Utc>, question_count: usize, extension: &str) -> String {
    artifact_file_name_with_sequence(timestamp, 0, question_count, extension)
}

/// Like [`artifact_file_name`], with `_<sequence>` after the timestamp when
/// `sequence > 0`, for batches saved within the same second.
pub fn artifact_file_name_with_sequence(
    timestamp: DateTime<Utc>,
    sequence: usize,
    question_count: usize,
    extension: &str,
) -> String {
    let stamp = timestamp.format("%Y-%m-%d-%H-%M-%S");
    if sequence == 0 {
        format!("{}{}-{}-questions.{}", ARTIFACT_PREFIX, stamp, question_count, extension)
    } else {
        format!(
            "{}{}_{}-{}-questions.{}",
            ARTIFACT_PREFIX, stamp, sequence, question_count, extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_artifact_file_name() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap();
        assert_eq!(
            artifact_file_name(ts, 2, "json"),
            "Forecasts-for-2025-02-03-04-05-06-2-questions.json"
        );
        assert_eq!(
            artifact_file_name_with_sequence(ts, 3, 2, "json"),
            "Forecasts-for-2025-02-03-04-05-06_3-2-questions.json"
        );
    }

    #[test]
    fn test_run_type_parse() {
        assert_eq!("benchmark".parse::<RunType>(), Ok(RunType::Benchmark));
        assert_eq!("unit-test".parse::<RunType>(), Ok(RunType::UnitTest));
        assert!("nightly".parse::<RunType>().is_err());
    }
}
