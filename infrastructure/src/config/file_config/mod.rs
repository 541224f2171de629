//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Conversion into application types reports problems as
//! [`ConfigIssue`]s instead of failing.

mod bot;
mod logging;
mod output;
mod quotas;

pub use bot::FileBotConfig;
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use quotas::{FileQuotaConfig, FileQuotasConfig};

use forecast_application::{BotConfig, QuotaRegistry};
use forecast_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Pipeline shape, skip gate, aggregation, persistence
    pub bot: FileBotConfig,
    /// Per-model quota overrides
    pub quotas: FileQuotasConfig,
    /// Log file settings
    pub logging: FileLoggingConfig,
    /// Console rendering
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.bot.to_bot_config().1;
        issues.extend(self.quotas.to_registry().1);
        issues
    }

    pub fn bot_config(&self) -> BotConfig {
        self.bot.to_bot_config().0
    }

    pub fn quota_registry(&self) -> QuotaRegistry {
        self.quotas.to_registry().0
    }
}
