mod parser;

use crate::constants::*;
use crate::llm::{mask_credential, RunOptions};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub use parser::load_config;

/// Application configuration
///
/// Every field has a default, so an empty or missing file yields a usable
/// configuration. Durations are written in humantime form (`"1s"`, `"500ms"`).
#[derive(Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible inference API
    #[serde(deserialize_with = "deserialize_url")]
    pub base_url: Url,
    /// API key; `GROQ_API_KEY` takes precedence when set
    pub api_key: Option<String>,
    /// Model proposed when creating an agent without `--model`
    pub default_model: String,
    /// Minimum delay between the end of one request and the start of the next
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_request_interval: Duration,
    /// Events kept in the live feed
    pub event_history_capacity: usize,
    /// Pending stream updates buffered per running task
    pub stream_buffer: usize,
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    /// SQLite file holding agents and tasks
    pub database_path: PathBuf,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            min_request_interval: parse_duration(DEFAULT_MIN_REQUEST_INTERVAL),
            event_history_capacity: DEFAULT_EVENT_HISTORY_CAPACITY,
            stream_buffer: DEFAULT_STREAM_BUFFER,
            request_timeout: parse_duration(DEFAULT_REQUEST_TIMEOUT),
            database_path: default_database_path(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_deref().map(mask_credential))
            .field("default_model", &self.default_model)
            .field("min_request_interval", &self.min_request_interval)
            .field("event_history_capacity", &self.event_history_capacity)
            .field("stream_buffer", &self.stream_buffer)
            .field("request_timeout", &self.request_timeout)
            .field("database_path", &self.database_path)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .finish()
    }
}

impl AppConfig {
    /// Sampling options applied to every task run
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            ..RunOptions::default()
        }
    }

    /// Replaces the configured key with `env_key` when it is set and not blank
    pub fn apply_api_key_override(&mut self, env_key: Option<String>) {
        if let Some(key) = env_key.map(|k| k.trim().to_string()) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
    }
}

/// `<data dir>/agentdeck/agentdeck.db`, or the working directory when the
/// platform has no data directory
pub fn default_database_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(DATA_DIR_NAME).join(DATABASE_FILE_NAME),
        None => PathBuf::from(DATABASE_FILE_NAME),
    }
}

fn default_base_url() -> Url {
    match Url::parse(DEFAULT_BASE_URL) {
        Ok(url) => url,
        Err(e) => unreachable!("default base URL is invalid: {}", e),
    }
}

fn parse_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

fn deserialize_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Url::parse(raw.trim()).map_err(serde::de::Error::custom)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}
