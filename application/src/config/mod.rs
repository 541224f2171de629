//! Application configuration.

pub mod bot_config;
pub mod config_value;

pub use bot_config::BotConfig;
pub use config_value::ConfigValue;
