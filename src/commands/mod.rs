//! Command handlers behind the CLI subcommands

mod agent;
mod render;
mod task;

use crate::api;
use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::core::{Dashboard, TaskExecutor};
use crate::db::{Database, SortOrder};
use crate::event::EventBus;
use crate::llm::models::known_models;
use crate::llm::providers::groq::GroqTransport;
use crate::llm::{mask_credential, InferenceClient, RequestSerializer};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub type CommandResult = Result<(), Box<dyn Error>>;

/// Runs the parsed command line against the loaded configuration
pub async fn run(cli: Cli, config: AppConfig) -> CommandResult {
    match cli.command {
        Command::Agent { action } => {
            let dashboard = build_dashboard(&config, "")?;
            agent::run(action, &dashboard, &config)
        }
        Command::Task { action } => task::run(action, &config).await,
        Command::Models => {
            for model in known_models() {
                println!("{}", render::model_line(model));
            }
            Ok(())
        }
        Command::Serve { port } => {
            let credential = match &config.api_key {
                Some(key) => {
                    info!("Using API key {}", mask_credential(key));
                    key.clone()
                }
                None => {
                    warn!("No API key configured, task executions will fail");
                    String::new()
                }
            };
            let dashboard = build_dashboard(&config, &credential)?;
            dashboard.recover_interrupted_tasks()?;
            api::server::launch_server(dashboard, port).await
        }
    }
}

/// Wires the store, event bus, inference client and executor together
///
/// # Arguments
///
/// * `config` - Loaded application configuration
/// * `credential` - API key used for every execution of this dashboard
pub fn build_dashboard(config: &AppConfig, credential: &str) -> Result<Dashboard, Box<dyn Error>> {
    let database = open_database(&config.database_path)?;
    let events = EventBus::new(config.event_history_capacity);
    let transport = GroqTransport::new(&config.base_url, config.request_timeout)?;
    let serializer = RequestSerializer::new(config.min_request_interval);
    info!(
        "Requests to {} are spaced by at least {:?}",
        transport.endpoint(),
        serializer.min_interval()
    );
    let client = InferenceClient::new(Arc::new(transport), serializer);
    let executor = TaskExecutor::new(database.clone(), client, events.clone(), credential)
        .with_options(config.run_options(), config.stream_buffer);
    Ok(Dashboard::new(database, events, executor))
}

fn sort_order(oldest: bool) -> SortOrder {
    if oldest {
        SortOrder::OldestFirst
    } else {
        SortOrder::NewestFirst
    }
}

fn open_database(path: &Path) -> Result<Database, Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(Database::open(&path.to_string_lossy())?)
}
