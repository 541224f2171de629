//! Config key registry for bot introspection.
//!
//! Defines metadata for the tunable parameters a forecast bot exposes
//! through its flat configuration mapping: name, description, and valid
//! values. The application layer's `BotConfig::get_config` produces exactly
//! these keys.

/// Metadata for a single config key.
#[derive(Debug, Clone)]
pub struct ConfigKeyInfo {
    /// Flat key name (e.g., `"research_reports_per_question"`).
    pub key: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Valid string values (empty if freeform).
    pub valid_values: &'static [&'static str],
}

/// All known config keys with their metadata.
pub fn known_keys() -> &'static [ConfigKeyInfo] {
    &KNOWN_KEYS
}

/// Look up a config key by name.
pub fn lookup_key(key: &str) -> Option<&'static ConfigKeyInfo> {
    KNOWN_KEYS.iter().find(|k| k.key == key)
}

static KNOWN_KEYS: [ConfigKeyInfo; 7] = [
    ConfigKeyInfo {
        key: "research_reports_per_question",
        description: "Independent research passes per question",
        valid_values: &[],
    },
    ConfigKeyInfo {
        key: "predictions_per_research_report",
        description: "Prediction attempts per successful research pass",
        valid_values: &[],
    },
    ConfigKeyInfo {
        key: "use_research_summary_to_forecast",
        description: "Hand the research summary instead of the full text to prediction",
        valid_values: &["true", "false"],
    },
    ConfigKeyInfo {
        key: "skip_previously_forecasted_questions",
        description: "Filter out questions the source marks as already forecasted",
        valid_values: &["true", "false"],
    },
    ConfigKeyInfo {
        key: "folder_to_save_reports_to",
        description: "Folder receiving one JSON artifact per batch (unset: no save)",
        valid_values: &[],
    },
    ConfigKeyInfo {
        key: "aggregation",
        description: "Statistic combining successful predictions",
        valid_values: &["mean", "median", "trimmed_mean"],
    },
    ConfigKeyInfo {
        key: "run_type",
        description: "Tag attached to persisted batches",
        valid_values: &["regular_forecast", "unit_test", "benchmark"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_not_empty() {
        assert!(!known_keys().is_empty());
    }

    #[test]
    fn test_lookup_existing_key() {
        let info = lookup_key("aggregation").unwrap();
        assert!(info.valid_values.contains(&"median"));
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(lookup_key("models.decision").is_none());
    }

    #[test]
    fn test_keys_are_unique() {
        let mut names: Vec<_> = known_keys().iter().map(|k| k.key).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), known_keys().len());
    }
}
