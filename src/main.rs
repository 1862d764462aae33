//! Main entry point for the application.
//!
//! Loads the environment and configuration, initializes logging and hands
//! the parsed command line to the command handlers. `serve` also writes
//! logs to rotating files.

mod agents;
mod api;
mod cli;
mod commands;
mod config;
mod constants;
mod core;
mod db;
mod errors;
mod event;
mod llm;
mod schema;
mod utils;

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let dotenv = dotenvy::dotenv();
    utils::init_logging(&cli.logging_level, matches!(cli.command, cli::Command::Serve { .. }));

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Configuration: {:?}", config);

    match commands::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
