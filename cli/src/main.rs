//! CLI entrypoint for forecast-bot
//!
//! Wires configuration loading, logging and the console presentation
//! together. Question sources and model providers are supplied by the
//! embedding application through the `forecast-application` ports.

use anyhow::{Context, Result};
use clap::Parser;
use forecast_application::BatchSummary;
use forecast_domain::{ForecastReport, OutputFormat};
use forecast_infrastructure::{ConfigLoader, FileConfig, load_reports};
use forecast_presentation::{Cli, Command, ConsoleFormatter, OutputFormatter};
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_FILE_PREFIX: &str = "forecast-bot.log";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?
    };

    if !config.output.color {
        colored::control::set_override(false);
    }

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.logging.directory());
    let _guard = init_logging(cli.verbose, log_dir.as_deref());

    info!("Starting forecast-bot");

    match &cli.command {
        Command::Config { sources: true } => {
            print!(
                "{}",
                ConsoleFormatter::format_sources(&ConfigLoader::config_sources(
                    cli.config.as_deref()
                ))
            );
        }
        Command::Config { sources: false } => show_config(&config),
        Command::Inspect { file, output } => {
            let format = output
                .map(OutputFormat::from)
                .or(config.output.format)
                .unwrap_or_default();
            inspect(file, format, cli.quiet)?;
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
///
/// Logs go to stderr; with a directory they are also written to a daily
/// rolling file. The returned guard must live until exit.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn show_config(config: &FileConfig) {
    let issues = config.validate();
    for issue in &issues {
        warn!("Configuration {}", issue);
    }

    let bot = config.bot_config();
    let quotas = config.quota_registry().quota_table();
    print!(
        "{}",
        ConsoleFormatter::format_config(&bot.get_config(), &quotas, &issues)
    );
}

fn inspect(file: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let reports: Vec<ForecastReport> =
        load_reports(file).with_context(|| format!("cannot inspect {}", file.display()))?;
    info!("Loaded {} report(s) from {}", reports.len(), file.display());

    println!("{}", ConsoleFormatter.render(&reports, format));

    if format != OutputFormat::Json && !quiet {
        let summary = BatchSummary {
            questions: reports.len(),
            reports: reports.len(),
            failures: 0,
            tolerated_errors: reports.iter().map(|r| r.errors().len()).sum(),
            skipped: 0,
        };
        print!("{}", ConsoleFormatter::format_batch_summary(&summary));
    }

    Ok(())
}
