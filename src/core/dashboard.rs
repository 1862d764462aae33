use super::{Task, TaskDraft, TaskExecutor, TaskStatus};
use crate::agents::{Agent, AgentDraft};
use crate::constants::INTERRUPTED_RESULT;
use crate::db::{AgentRepository, Database, SortOrder, TaskRepository};
use crate::errors::TaskError;
use crate::event::{EventBus, EventKind, NewEvent, StreamEvent};
use tracing::{info, warn};

/// Agent and task operations shared by the CLI and the HTTP API.
///
/// Mutations are written to the store and announced on the event bus as
/// `system` events; executions are delegated to the [`TaskExecutor`].
#[derive(Debug, Clone)]
pub struct Dashboard {
    database: Database,
    events: EventBus,
    executor: TaskExecutor,
}

impl Dashboard {
    pub fn new(database: Database, events: EventBus, executor: TaskExecutor) -> Self {
        Self {
            database,
            events,
            executor,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn list_agents(&self, order: SortOrder) -> Result<Vec<Agent>, TaskError> {
        let mut conn = self.database.get_conn()?;
        Ok(AgentRepository::new(&mut conn).list(order)?)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Agent, TaskError> {
        let mut conn = self.database.get_conn()?;
        Ok(AgentRepository::new(&mut conn).get(agent_id)?)
    }

    /// Creates an agent from a draft
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidInput` when the name, prompt or model is blank
    pub fn create_agent(&self, draft: AgentDraft) -> Result<Agent, TaskError> {
        let draft = validate_agent(draft)?;
        let agent = Agent::new(draft);
        let mut conn = self.database.get_conn()?;
        AgentRepository::new(&mut conn).create(&agent)?;

        info!("Created agent {} ({})", agent.name, agent.id);
        self.announce(
            format!("Agent {} created", agent.label()),
            Some(&agent.id),
            None,
        );
        Ok(agent)
    }

    pub fn update_agent(&self, agent_id: &str, draft: AgentDraft) -> Result<Agent, TaskError> {
        let draft = validate_agent(draft)?;
        let mut conn = self.database.get_conn()?;
        let mut repo = AgentRepository::new(&mut conn);
        let mut agent = repo.get(agent_id)?;
        agent.apply(draft);
        repo.update(&agent)?;

        self.announce(
            format!("Agent {} updated", agent.label()),
            Some(&agent.id),
            None,
        );
        Ok(agent)
    }

    pub fn delete_agent(&self, agent_id: &str) -> Result<(), TaskError> {
        let mut conn = self.database.get_conn()?;
        let mut repo = AgentRepository::new(&mut conn);
        let agent = repo.get(agent_id)?;
        repo.delete(agent_id)?;

        info!("Deleted agent {}", agent_id);
        self.announce(format!("Agent {} deleted", agent.name), None, None);
        Ok(())
    }

    /// Lists tasks by creation date, optionally only those in `status`
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        order: SortOrder,
    ) -> Result<Vec<Task>, TaskError> {
        let mut conn = self.database.get_conn()?;
        Ok(TaskRepository::new(&mut conn).list(order, status)?)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, TaskError> {
        let mut conn = self.database.get_conn()?;
        Ok(TaskRepository::new(&mut conn).get(task_id)?)
    }

    /// Creates a task in the `todo` state
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidInput` for a blank title, and
    /// `StoreError::NotFound` when the agent or the parent task does not exist
    pub fn create_task(&self, mut draft: TaskDraft) -> Result<Task, TaskError> {
        draft.title = draft.title.trim().to_string();
        if draft.title.is_empty() {
            return Err(TaskError::InvalidInput("task title is required".to_string()));
        }
        draft.parent_task_id = draft.parent_task_id.filter(|id| !id.trim().is_empty());

        let mut conn = self.database.get_conn()?;
        AgentRepository::new(&mut conn).get(&draft.agent_id)?;
        let mut repo = TaskRepository::new(&mut conn);
        if let Some(parent_id) = &draft.parent_task_id {
            repo.get(parent_id)?;
        }

        let task = Task::new(draft);
        repo.create(&task)?;

        info!("Created task {} ({})", task.title, task.id);
        self.announce(
            format!("Task \"{}\" created", task.title),
            Some(&task.agent_id),
            Some(&task.id),
        );
        Ok(task)
    }

    /// Deletes a task; tasks chained after it lose their parent
    pub fn delete_task(&self, task_id: &str) -> Result<(), TaskError> {
        let mut conn = self.database.get_conn()?;
        let mut repo = TaskRepository::new(&mut conn);
        let task = repo.get(task_id)?;
        if task.status == TaskStatus::InProgress {
            return Err(TaskError::InvalidInput(format!(
                "task {} is running and cannot be deleted",
                task_id
            )));
        }
        let unlinked = repo.children(task_id)?.len();
        repo.delete(task_id)?;

        info!("Deleted task {}, {} chained task(s) unlinked", task_id, unlinked);
        self.announce(format!("Task \"{}\" deleted", task.title), None, None);
        Ok(())
    }

    /// Fails the tasks a previous process left `in_progress`
    ///
    /// Only call this while no other process runs tasks on the same store.
    ///
    /// # Returns
    ///
    /// The number of tasks marked failed
    pub fn recover_interrupted_tasks(&self) -> Result<usize, TaskError> {
        let mut conn = self.database.get_conn()?;
        let recovered = TaskRepository::new(&mut conn).fail_running(INTERRUPTED_RESULT)?;
        if recovered > 0 {
            warn!("{} interrupted task(s) marked failed", recovered);
            self.announce(
                format!("{} interrupted task(s) marked failed", recovered),
                None,
                None,
            );
        }
        Ok(recovered)
    }

    /// Runs a task to completion and returns it in its final state
    pub async fn execute_task(&self, task_id: &str) -> Result<Task, TaskError> {
        self.executor.execute(task_id).await
    }

    pub fn streaming_output(&self, task_id: &str) -> Result<Option<String>, TaskError> {
        // Unknown ids are reported instead of looking like an idle task.
        self.get_task(task_id)?;
        Ok(self.executor.streaming_output(task_id))
    }

    pub fn recent_events(&self) -> Vec<StreamEvent> {
        self.events.recent()
    }

    pub fn clear_events(&self) {
        self.events.clear();
    }

    fn announce(&self, content: String, agent_id: Option<&str>, task_id: Option<&str>) {
        let mut event = NewEvent::new(EventKind::System, content);
        if let Some(agent_id) = agent_id {
            event = event.with_agent(agent_id);
        }
        if let Some(task_id) = task_id {
            event = event.with_task(task_id);
        }
        self.events.publish(event);
    }
}

fn validate_agent(mut draft: AgentDraft) -> Result<AgentDraft, TaskError> {
    draft.name = draft.name.trim().to_string();
    draft.model = draft.model.trim().to_string();
    if draft.name.is_empty() {
        return Err(TaskError::InvalidInput("agent name is required".to_string()));
    }
    if draft.system_prompt.trim().is_empty() {
        return Err(TaskError::InvalidInput(
            "agent system prompt is required".to_string(),
        ));
    }
    if draft.model.is_empty() {
        return Err(TaskError::InvalidInput("agent model is required".to_string()));
    }
    draft.capabilities = clean_list(draft.capabilities);
    draft.functions = clean_list(draft.functions);
    Ok(draft)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
