mod bus;

pub use bus::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of an entry in the live activity feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An agent is waiting on the provider
    Thinking,
    /// Content produced for a task
    Output,
    /// An agent asked for one of its functions
    FunctionCall,
    /// A task execution failed
    Error,
    /// Application level notice
    System,
    /// An agent started or finished working
    AgentStatus,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Thinking => "thinking",
            EventKind::Output => "output",
            EventKind::FunctionCall => "function_call",
            EventKind::Error => "error",
            EventKind::System => "system",
            EventKind::AgentStatus => "agent_status",
        };
        f.write_str(label)
    }
}

/// An event as stored in the bus history and handed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unique identifier assigned on publish
    pub id: String,
    /// What happened
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Human readable content
    pub content: String,
    /// Publication time
    pub timestamp: DateTime<Utc>,
    /// Agent the event originates from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Task the event belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Free-form structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StreamEvent {
    /// Whether this is one streamed fragment of a task's output rather than
    /// the complete text
    pub fn is_partial(&self) -> bool {
        self.kind == EventKind::Output
            && self
                .metadata
                .as_ref()
                .and_then(|m| m.get("partial"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

/// An event before the bus gives it an id and a timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub content: String,
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub metadata: Option<Value>,
}

impl NewEvent {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            agent_id: None,
            task_id: None,
            metadata: None,
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
