use crate::agents::Agent;
use crate::core::Task;
use crate::errors::StoreError;
use crate::schema::{agents, tasks};
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable};

/// Represents an agent in the database
#[derive(Debug, Clone, Queryable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = agents)]
pub struct AgentRow {
    pub id: String,
    pub name: String,
    pub role: String,
    pub system_prompt: String,
    pub model: String,
    /// JSON array of capability strings
    pub capabilities: String,
    /// JSON array of function names
    pub functions: String,
    pub created_date: String,
}

/// Represents a task in the database
#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = tasks)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub result: Option<String>,
    pub agent_id: String,
    pub parent_task_id: Option<String>,
    pub output_format: String,
    pub created_date: String,
    pub updated_date: String,
}

/// Timestamps are stored as fixed-width RFC 3339 so text ordering matches
/// time ordering.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", value, e)))
}

impl AgentRow {
    pub fn from_agent(agent: &Agent) -> Result<Self, StoreError> {
        Ok(Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            role: agent.role.to_string(),
            system_prompt: agent.system_prompt.clone(),
            model: agent.model.clone(),
            capabilities: serde_json::to_string(&agent.capabilities)?,
            functions: serde_json::to_string(&agent.functions)?,
            created_date: format_timestamp(&agent.created_date),
        })
    }

    pub fn into_agent(self) -> Result<Agent, StoreError> {
        Ok(Agent {
            role: self.role.parse().map_err(StoreError::Corrupt)?,
            capabilities: serde_json::from_str(&self.capabilities)?,
            functions: serde_json::from_str(&self.functions)?,
            created_date: parse_timestamp(&self.created_date)?,
            id: self.id,
            name: self.name,
            system_prompt: self.system_prompt,
            model: self.model,
        })
    }
}

impl TaskRow {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.to_string(),
            result: task.result.clone(),
            agent_id: task.agent_id.clone(),
            parent_task_id: task.parent_task_id.clone(),
            output_format: task.output_format.to_string(),
            created_date: format_timestamp(&task.created_date),
            updated_date: format_timestamp(&Utc::now()),
        }
    }

    pub fn into_task(self) -> Result<Task, StoreError> {
        Ok(Task {
            status: self.status.parse().map_err(StoreError::Corrupt)?,
            output_format: self.output_format.parse().map_err(StoreError::Corrupt)?,
            created_date: parse_timestamp(&self.created_date)?,
            id: self.id,
            title: self.title,
            description: self.description,
            result: self.result,
            agent_id: self.agent_id,
            parent_task_id: self.parent_task_id,
        })
    }
}
