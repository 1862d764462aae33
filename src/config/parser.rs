use super::AppConfig;
use crate::constants::API_KEY_ENV;
use crate::errors::ConfigError;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

/// Loads the application configuration
///
/// # Arguments
///
/// * `file_path` - Optional path to a YAML configuration file. Without it the
///   defaults are used.
///
/// # Returns
///
/// * `Result<AppConfig, ConfigError>` - The validated configuration, with the
///   API key taken from `GROQ_API_KEY` when that variable is set
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read
/// * The YAML content cannot be parsed into an AppConfig
/// * A value is out of range
pub fn load_config(file_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match file_path {
        Some(path) => {
            let yaml_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let config = parse_config(&yaml_str)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => {
            debug!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };
    config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
    Ok(config)
}

/// Parses and validates YAML configuration text
pub fn parse_config(yaml_str: &str) -> Result<AppConfig, ConfigError> {
    // An empty document deserializes as null, not as an empty mapping.
    let config: AppConfig = if yaml_str.trim().is_empty() {
        AppConfig::default()
    } else {
        serde_yaml::from_str(yaml_str)?
    };
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if !matches!(config.base_url.scheme(), "http" | "https") {
        return Err(invalid("base_url", "must be an http or https URL"));
    }
    if config.default_model.trim().is_empty() {
        return Err(invalid("default_model", "must not be empty"));
    }
    if config.event_history_capacity == 0 {
        return Err(invalid("event_history_capacity", "must be at least 1"));
    }
    if config.stream_buffer == 0 {
        return Err(invalid("stream_buffer", "must be at least 1"));
    }
    if config.request_timeout.is_zero() {
        return Err(invalid("request_timeout", "must be greater than zero"));
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(invalid("temperature", "must be between 0 and 2"));
    }
    if !(0.0..=1.0).contains(&config.top_p) {
        return Err(invalid("top_p", "must be between 0 and 1"));
    }
    Ok(())
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}
