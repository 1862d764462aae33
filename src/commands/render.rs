//! Terminal rendering of agents, tasks and live events.

use crate::agents::Agent;
use crate::core::{Task, TaskStatus};
use crate::event::{EventKind, StreamEvent};
use crate::llm::models::ModelSpec;
use colored::{ColoredString, Colorize};

const PREVIEW_CHARS: usize = 60;

pub fn status_badge(status: TaskStatus) -> ColoredString {
    match status {
        TaskStatus::Todo => status.as_str().normal(),
        TaskStatus::InProgress => status.as_str().yellow(),
        TaskStatus::Done => status.as_str().green(),
        TaskStatus::Failed => status.as_str().red(),
    }
}

pub fn agent_line(agent: &Agent) -> String {
    format!(
        "{}  {} {} {}",
        agent.id.dimmed(),
        agent.label().bold(),
        format!("[{}]", agent.role).cyan(),
        agent.model.dimmed()
    )
}

pub fn agent_details(agent: &Agent) -> String {
    format!(
        "{}\n{} {}\n{} {}\n{} {}\n\n{}",
        agent.label().bold(),
        "id:".dimmed(),
        agent.id,
        "role:".dimmed(),
        agent.role,
        "model:".dimmed(),
        agent.model,
        agent.system_message()
    )
}

/// One row of the task list
///
/// # Arguments
///
/// * `task` - Task to describe
/// * `agent_name` - Name of the assigned agent, when it still exists
pub fn task_line(task: &Task, agent_name: Option<&str>) -> String {
    let mut line = format!(
        "{}  {:<11} {}",
        task.id.dimmed(),
        status_badge(task.status),
        task.title.bold()
    );
    if let Some(name) = agent_name {
        line.push_str(&format!(" {}", format!("@{}", name).cyan()));
    }
    if task.parent_task_id.is_some() {
        line.push_str(&format!(" {}", "(chained)".dimmed()));
    }
    if let Some(result) = &task.result {
        line.push_str(&format!("\n    {}", preview(result).dimmed()));
    }
    line
}

pub fn task_details(task: &Task) -> String {
    let mut details = format!(
        "{}\n{} {}\n{} {}\n{} {}\n{} {}",
        task.title.bold(),
        "id:".dimmed(),
        task.id,
        "status:".dimmed(),
        status_badge(task.status),
        "agent:".dimmed(),
        task.agent_id,
        "format:".dimmed(),
        task.output_format
    );
    if let Some(parent) = &task.parent_task_id {
        details.push_str(&format!("\n{} {}", "after:".dimmed(), parent));
    }
    if !task.description.trim().is_empty() {
        details.push_str(&format!("\n\n{}", task.description.trim()));
    }
    if let Some(result) = &task.result {
        details.push_str(&format!("\n\n{}\n{}", "Result:".bold(), result));
    }
    details
}

pub fn model_line(model: &ModelSpec) -> String {
    let mut line = format!(
        "{:<45} {:<22} {:>7} tokens",
        model.id.bold(),
        model.label,
        model.max_completion_tokens
    );
    if !model.builtin_tools.is_empty() {
        line.push_str(&format!("  {}", model.builtin_tools.join(", ").dimmed()));
    }
    line
}

/// One line of the live event feed
pub fn event_line(event: &StreamEvent) -> String {
    let time = event.timestamp.format("%H:%M:%S").to_string();
    let tag = match event.kind {
        EventKind::Thinking => "thinking".magenta(),
        EventKind::Output => "output".green(),
        EventKind::FunctionCall => "function".blue(),
        EventKind::Error => "error".red().bold(),
        EventKind::System => "system".normal(),
        EventKind::AgentStatus => "agent".cyan(),
    };
    format!("{} {:>8} {}", time.dimmed(), tag, preview(&event.content))
}

/// First line of `text`, cut to a fixed number of characters
fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    let mut shown: String = first_line.chars().take(PREVIEW_CHARS).collect();
    if shown.len() < first_line.len() || text.trim().lines().count() > 1 {
        shown.push_str("...");
    }
    shown
}
