//! Quota overrides from TOML (`[quotas]` section)

use forecast_application::QuotaRegistry;
use forecast_domain::{ConfigIssue, ConfigIssueCode, Model, QuotaConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One quota table. Unset fields keep the underlying quota's value.
///
/// # Example
///
/// ```toml
/// [quotas.default]
/// requests_per_period = 60
/// period_seconds = 60
/// tokens_per_period = 200000
/// timeout_seconds = 60
///
/// [quotas.models."o3-mini"]
/// tokens_per_period = 500000
/// token_period_seconds = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuotaConfig {
    pub requests_per_period: Option<u64>,
    pub tokens_per_period: Option<u64>,
    /// Sets both window lengths unless the specific one is given
    pub period_seconds: Option<f64>,
    pub request_period_seconds: Option<f64>,
    pub token_period_seconds: Option<f64>,
    pub timeout_seconds: Option<f64>,
}

/// Raw quota configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuotasConfig {
    /// Quota for models without a published or configured quota
    pub default: FileQuotaConfig,
    /// Per-model overrides, keyed by model id
    pub models: BTreeMap<String, FileQuotaConfig>,
}

fn seconds(field: &str, value: Option<f64>, issues: &mut Vec<ConfigIssue>) -> Option<Duration> {
    let secs = value?;
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Some(duration),
        Err(_) => {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidConstraint {
                    field: field.to_string(),
                },
                format!("{}: {} is not a valid number of seconds", field, secs),
            ));
            None
        }
    }
}

impl FileQuotaConfig {
    /// Layer this table over `base`.
    ///
    /// Returns `None` (plus issues) when the result is not a usable quota.
    pub fn apply(&self, section: &str, base: QuotaConfig) -> (Option<QuotaConfig>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = |name: &str| format!("{}.{}", section, name);

        let period = seconds(&field("period_seconds"), self.period_seconds, &mut issues);
        let request_period = seconds(
            &field("request_period_seconds"),
            self.request_period_seconds,
            &mut issues,
        );
        let token_period = seconds(
            &field("token_period_seconds"),
            self.token_period_seconds,
            &mut issues,
        );
        let timeout = seconds(&field("timeout_seconds"), self.timeout_seconds, &mut issues);
        if !issues.is_empty() {
            return (None, issues);
        }

        let quota = QuotaConfig {
            requests_per_period: self.requests_per_period.unwrap_or(base.requests_per_period),
            request_period: request_period.or(period).unwrap_or(base.request_period),
            tokens_per_period: self.tokens_per_period.unwrap_or(base.tokens_per_period),
            token_period: token_period.or(period).unwrap_or(base.token_period),
            timeout: timeout.unwrap_or(base.timeout),
        };

        match quota.validate() {
            Ok(()) => (Some(quota), issues),
            Err(errors) => {
                for e in errors {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::InvalidConstraint {
                            field: section.to_string(),
                        },
                        format!("{}: {}", section, e),
                    ));
                }
                (None, issues)
            }
        }
    }
}

impl FileQuotasConfig {
    /// Build a registry with the configured default and per-model quotas.
    ///
    /// Invalid tables are reported and left out.
    pub fn to_registry(&self) -> (QuotaRegistry, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (default_quota, default_issues) =
            self.default.apply("quotas.default", QuotaConfig::default());
        issues.extend(default_issues);
        let default_quota = default_quota.unwrap_or_default();

        let mut registry = QuotaRegistry::with_default_quota(default_quota);
        for (name, table) in &self.models {
            let section = format!("quotas.models.\"{}\"", name);
            if name.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyModelName {
                        field: "quotas.models".to_string(),
                    },
                    "quotas.models: model name cannot be empty",
                ));
                continue;
            }
            let model = Model::from(name.as_str());
            let base = model.builtin_quota().unwrap_or(default_quota);
            let (quota, model_issues) = table.apply(&section, base);
            issues.extend(model_issues);
            if let Some(quota) = quota {
                registry = registry.with_quota(model, quota);
            }
        }

        (registry, issues)
    }
}
