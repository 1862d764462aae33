//! Agents: reusable personas combining a system prompt and a model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role an agent plays, used for grouping and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Manager,
    Architect,
    Engineer,
    Analyst,
    Writer,
    Custom,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Manager => "manager",
            AgentRole::Architect => "architect",
            AgentRole::Engineer => "engineer",
            AgentRole::Analyst => "analyst",
            AgentRole::Writer => "writer",
            AgentRole::Custom => "custom",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AgentRole::Manager => "👔",
            AgentRole::Architect => "📐",
            AgentRole::Engineer => "🛠️",
            AgentRole::Analyst => "📊",
            AgentRole::Writer => "✍️",
            AgentRole::Custom => "🤖",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(AgentRole::Manager),
            "architect" => Ok(AgentRole::Architect),
            "engineer" => Ok(AgentRole::Engineer),
            "analyst" => Ok(AgentRole::Analyst),
            "writer" => Ok(AgentRole::Writer),
            "custom" => Ok(AgentRole::Custom),
            other => Err(format!("unknown agent role '{}'", other)),
        }
    }
}

/// A named system prompt bound to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub system_prompt: String,
    pub model: String,
    /// What the agent is good at, listed in its system message
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Functions the agent may ask for, listed in its system message
    #[serde(default)]
    pub functions: Vec<String>,
    pub created_date: DateTime<Utc>,
}

/// Fields supplied by the user when creating or editing an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDraft {
    pub name: String,
    pub role: AgentRole,
    pub system_prompt: String,
    pub model: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

impl Agent {
    pub fn new(draft: AgentDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            role: draft.role,
            system_prompt: draft.system_prompt,
            model: draft.model,
            capabilities: draft.capabilities,
            functions: draft.functions,
            created_date: Utc::now(),
        }
    }

    /// Replaces the editable fields, keeping id and creation date.
    pub fn apply(&mut self, draft: AgentDraft) {
        self.name = draft.name;
        self.role = draft.role;
        self.system_prompt = draft.system_prompt;
        self.model = draft.model;
        self.capabilities = draft.capabilities;
        self.functions = draft.functions;
    }

    /// System message sent ahead of every task run by this agent.
    pub fn system_message(&self) -> String {
        let mut message = self.system_prompt.trim().to_string();
        append_section(&mut message, "Capabilities:", &self.capabilities);
        append_section(&mut message, "Available functions:", &self.functions);
        message
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.role.icon(), self.name)
    }
}

fn append_section(message: &mut String, title: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();
    if items.is_empty() {
        return;
    }
    if !message.is_empty() {
        message.push_str("\n\n");
    }
    message.push_str(title);
    for item in items {
        message.push_str("\n- ");
        message.push_str(item);
    }
}
