//! Remedy CLI entry point.

use clap::Parser;

use remedy::cli::commands::{diagnose, fix, history, normalize, validate, watch};
use remedy::cli::{handle_error, load_config, Cli, Commands};
use remedy::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, json),
    };

    let log_config = match LogConfig::from_settings(&config.logging) {
        Ok(log_config) => match cli.verbosity_level() {
            Some(level) => log_config.with_level(level),
            None => log_config,
        },
        Err(err) => handle_error(err, json),
    };
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json),
    };

    let result = match cli.command {
        Commands::Normalize(args) => normalize::execute(args, json).await,
        Commands::Validate(args) => validate::execute(args, json).await,
        Commands::Diagnose(args) => diagnose::execute(args, &config, json).await,
        Commands::Fix(args) => fix::execute(args, &config, json).await,
        Commands::Watch(args) => watch::execute(args, &config, json).await,
        Commands::History(args) => history::execute(args, &config, json).await,
    };

    if let Err(err) = result {
        handle_error(err, json);
    }
}
