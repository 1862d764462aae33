use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but never executed
    Todo,
    /// A request for the task is queued or streaming
    InProgress,
    /// Last execution succeeded
    Done,
    /// Last execution failed
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    /// Whether the execution state machine allows moving to `next`.
    ///
    /// `todo -> in_progress -> done | failed`, and a finished task may be
    /// executed again.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Todo, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::InProgress, TaskStatus::Failed)
                | (TaskStatus::Done, TaskStatus::InProgress)
                | (TaskStatus::Failed, TaskStatus::InProgress)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Parses the stored representation of a status
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(TaskStatus::Todo.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Done));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn terminal_tasks_can_rerun() {
        assert!(TaskStatus::Done.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::Failed.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn shortcuts_and_reentry_are_rejected() {
        assert!(!TaskStatus::Todo.can_transition_to(TaskStatus::Done));
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Done.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn parses_stored_values() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert!("In Progress".parse::<TaskStatus>().is_err());
    }
}
