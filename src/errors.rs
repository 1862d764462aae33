use crate::core::TaskStatus;
use crate::llm::InferenceError;
use diesel::r2d2::PoolError;
use diesel::result::Error as DieselError;
use std::path::PathBuf;

/// Failures of the local store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Diesel error: {0}")]
    DieselError(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    PoolError(#[from] PoolError),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Agent {0} is still assigned to tasks")]
    AgentInUse(String),
    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

/// Failures of dashboard operations; for executions this is also the
/// task's terminal error
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Dependency not satisfied: parent task {parent_id} is {status}")]
    DependencyNotSatisfied { parent_id: String, status: String },
    #[error("Cannot move task from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("Response is not a valid JSON object: {0}")]
    InvalidJsonOutput(String),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Failures while loading the application configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}
