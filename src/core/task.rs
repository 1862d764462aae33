use super::task_state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Shape of the content a task asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    JsonObject,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::JsonObject => "json_object",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json_object" => Ok(OutputFormat::JsonObject),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// One prompt execution request against an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Streamed content of the last run, or its error message
    pub result: Option<String>,
    pub agent_id: String,
    /// Task whose result is fed to this one as context
    pub parent_task_id: Option<String>,
    pub output_format: OutputFormat,
    pub created_date: DateTime<Utc>,
}

/// Fields supplied by the user when creating a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub agent_id: String,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Task {
    /// Creates a new Task in the `todo` state
    pub fn new(draft: TaskDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            status: TaskStatus::Todo,
            result: None,
            agent_id: draft.agent_id,
            parent_task_id: draft.parent_task_id,
            output_format: draft.output_format,
            created_date: Utc::now(),
        }
    }

    /// User message for this task, with the parent's result as context
    ///
    /// # Arguments
    ///
    /// * `parent` - Completed parent task, if the task is chained
    pub fn prompt(&self, parent: Option<&Task>) -> String {
        let mut prompt = String::new();
        if let Some(parent) = parent {
            prompt.push_str(&format!(
                "Context from previous task \"{}\":\n{}\n\n",
                parent.title,
                parent.result.as_deref().unwrap_or_default()
            ));
        }
        prompt.push_str(&format!("Task: {}", self.title));
        if !self.description.trim().is_empty() {
            prompt.push('\n');
            prompt.push_str(self.description.trim());
        }
        if self.output_format == OutputFormat::JsonObject {
            prompt.push_str("\n\nRespond with a single JSON object.");
        }
        prompt
    }
}
