//! Configuration file loading for forecast-bot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `FORECAST_BOT_*` environment variables (`__` separates nesting)
//! 2. `--config <path>` specified file
//! 3. Project root: `./forecast-bot.toml` or `./.forecast-bot.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/forecast-bot/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileBotConfig, FileConfig, FileLoggingConfig, FileOutputConfig, FileQuotaConfig,
    FileQuotasConfig,
};
pub use loader::ConfigLoader;
