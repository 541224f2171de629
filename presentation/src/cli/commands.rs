//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for saved forecast reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Research, predictions and errors per question
    Full,
    /// One line per question with the final prediction
    Summary,
    /// JSON output
    Json,
}

impl From<OutputFormat> for forecast_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => forecast_domain::OutputFormat::Full,
            OutputFormat::Summary => forecast_domain::OutputFormat::Summary,
            OutputFormat::Json => forecast_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for forecast-bot
#[derive(Parser, Debug)]
#[command(name = "forecast-bot")]
#[command(author, version, about = "Forecast bot engine - research, predict, aggregate")]
#[command(long_about = r#"
forecast-bot forecasts questions by running several research passes per
question, several predictions per research text, and aggregating the
successful predictions into one report per question. Provider calls are
admitted through per-model request and token quotas.

Configuration files are loaded from (in priority order):
1. FORECAST_BOT_* environment variables
2. --config <path>     Explicit config file
3. ./forecast-bot.toml Project-level config
4. ~/.config/forecast-bot/config.toml   Global config

Example:
  forecast-bot config
  forecast-bot config --sources
  forecast-bot inspect reports/Forecasts-for-2026-10-18-12-00-3-questions.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print only the requested output (no batch summary after `inspect`)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Directory for daily log files (overrides `logging.directory`)
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the resolved configuration and its validation issues
    Config {
        /// List configuration file locations instead
        #[arg(long)]
        sources: bool,
    },

    /// Print a saved forecast artifact
    Inspect {
        /// Artifact written by a forecasting run
        file: PathBuf,

        /// Output format (defaults to `output.format`, then summary)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },
}
