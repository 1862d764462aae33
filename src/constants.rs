use std::time::Duration;

/// Base URL of the OpenAI-compatible Groq inference API
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Path appended to the base URL for streamed chat completions
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Model used when neither the agent nor the configuration names one
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Every Groq API key starts with this literal
pub const CREDENTIAL_PREFIX: &str = "gsk_";

/// Shortest key accepted before any network activity is attempted
pub const MIN_CREDENTIAL_LENGTH: usize = 40;

/// Completion token limit for models missing from the model table
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 8192;

/// Prefix carried by every data frame of a streamed response
pub const DATA_FRAME_PREFIX: &str = "data: ";

/// Line marking the end of a streamed response
pub const STREAM_TERMINATOR: &str = "data: [DONE]";

/// Status pushed to stream consumers while waiting for the first token
pub const THINKING_STATUS: &str = "Thinking...";

/// Number of events kept in the live feed history
pub const DEFAULT_EVENT_HISTORY_CAPACITY: usize = 100;

/// Capacity of the channel carrying stream updates to a consumer
pub const DEFAULT_STREAM_BUFFER: usize = 64;

pub const DEFAULT_MIN_REQUEST_INTERVAL: &str = "1s";

pub const DEFAULT_REQUEST_TIMEOUT: &str = "120s";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_TOP_P: f32 = 1.0;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// File name of the local database inside the data directory
pub const DATABASE_FILE_NAME: &str = "agentdeck.db";

/// Directory under the user data directory holding the database
pub const DATA_DIR_NAME: &str = "agentdeck";

/// Port of the HTTP API when `serve` is started without `--port`
pub const DEFAULT_API_PORT: u16 = 3000;

/// How long a store call waits for the pooled connection before failing
pub const DB_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Result stored for a run that stopped before recording its outcome
pub const INTERRUPTED_RESULT: &str = "Error: interrupted";
