use super::{OutputFormat, Task, TaskStatus};
use crate::agents::Agent;
use crate::constants::INTERRUPTED_RESULT;
use crate::db::{AgentRepository, Database, TaskRepository};
use crate::errors::{StoreError, TaskError};
use crate::event::{EventBus, EventKind, NewEvent};
use crate::llm::{ChatMessage, InferenceClient, RunOptions, StreamUpdate};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Runs tasks against their agent and records the outcome.
///
/// The executor owns the task side of the execution state machine: it moves
/// the task to `in_progress`, streams the response into a transient buffer
/// and onto the event bus as partial `output` events, and finally stores
/// `done` with the text, or `failed` with the error.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    database: Database,
    client: InferenceClient,
    events: EventBus,
    credential: String,
    options: RunOptions,
    stream_buffer: usize,
    streaming: Arc<Mutex<HashMap<String, String>>>,
}

impl TaskExecutor {
    pub fn new(
        database: Database,
        client: InferenceClient,
        events: EventBus,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            database,
            client,
            events,
            credential: credential.into(),
            options: RunOptions::default(),
            stream_buffer: crate::constants::DEFAULT_STREAM_BUFFER,
            streaming: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_options(mut self, options: RunOptions, stream_buffer: usize) -> Self {
        self.options = options;
        self.stream_buffer = stream_buffer.max(1);
        self
    }

    #[cfg(test)]
    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Text streamed so far for a task that is currently running.
    pub fn streaming_output(&self, task_id: &str) -> Option<String> {
        self.buffers().get(task_id).cloned()
    }

    /// Executes a task and returns it in its final state.
    ///
    /// A task already `in_progress` is rejected untouched. Any other failure
    /// leaves the task `failed` with `Error: <message>` as its result, and
    /// is returned to the caller as well. If the returned future is dropped
    /// before the run settles, the task is recorded as interrupted.
    pub async fn execute(&self, task_id: &str) -> Result<Task, TaskError> {
        let started = self.with_tasks(|repo| repo.start(task_id))?;
        let mut task = self.with_tasks(|repo| repo.get(task_id))?;
        if !started {
            return Err(TaskError::InvalidTransition {
                from: task.status,
                to: TaskStatus::InProgress,
            });
        }
        info!("Task {} ({}) started", task.id, task.title);

        let guard = RunGuard::new(self, &task);
        let outcome = match self.run(&task).await {
            Ok(text) => self
                .with_tasks(|repo| repo.update_status(&task.id, TaskStatus::Done, Some(&text)))
                .map(|()| text)
                .map_err(TaskError::from),
            Err(err) => Err(err),
        };
        guard.settle();

        match outcome {
            Ok(text) => {
                task.status = TaskStatus::Done;
                task.result = Some(text);
                info!("Task {} done", task.id);
                Ok(task)
            }
            Err(err) => {
                error!("Task {} failed: {}", task.id, err);
                self.record_failure(&task, format!("Error: {}", err));
                Err(err)
            }
        }
    }

    async fn run(&self, task: &Task) -> Result<String, TaskError> {
        let agent = self.with_agents(|repo| repo.get(&task.agent_id))?;
        let parent = self.satisfied_parent(task)?;

        self.publish(&agent, task, EventKind::AgentStatus, format!("{} started \"{}\"", agent.name, task.title));

        let conversation = vec![
            ChatMessage::system(&agent.system_message()),
            ChatMessage::user(&task.prompt(parent.as_ref())),
        ];
        let options = RunOptions {
            json_output: task.output_format == OutputFormat::JsonObject,
            ..self.options.clone()
        };

        let (tx, mut rx) = mpsc::channel(self.stream_buffer);
        let request = self
            .client
            .run(&self.credential, &agent.model, conversation, &options, Some(tx));
        let consume = async {
            while let Some(update) = rx.recv().await {
                match update {
                    StreamUpdate::Status(Some(status)) => {
                        self.publish(&agent, task, EventKind::Thinking, format!("{}: {}", agent.name, status));
                    }
                    StreamUpdate::Status(None) => {
                        debug!("First tokens received for task {}", task.id);
                    }
                    StreamUpdate::Delta { delta, accumulated } => {
                        self.buffers().insert(task.id.clone(), accumulated);
                        self.events.publish(
                            NewEvent::new(EventKind::Output, delta)
                                .with_agent(agent.id.clone())
                                .with_task(task.id.clone())
                                .with_metadata(json!({ "partial": true })),
                        );
                    }
                }
            }
        };
        let (text, ()) = tokio::join!(request, consume);
        let text = text?;

        if task.output_format == OutputFormat::JsonObject {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) if value.is_object() => {}
                Ok(_) => {
                    return Err(TaskError::InvalidJsonOutput(
                        "top-level value is not an object".to_string(),
                    ))
                }
                Err(e) => return Err(TaskError::InvalidJsonOutput(e.to_string())),
            }
        }

        let event = NewEvent::new(EventKind::Output, text.clone())
            .with_agent(agent.id.clone())
            .with_task(task.id.clone())
            .with_metadata(json!({
                "model": agent.model,
                "output_format": task.output_format,
                "partial": false,
            }));
        self.events.publish(event);
        Ok(text)
    }

    /// Loads the parent of a chained task, requiring it to be done.
    fn satisfied_parent(&self, task: &Task) -> Result<Option<Task>, TaskError> {
        let Some(parent_id) = &task.parent_task_id else {
            return Ok(None);
        };
        let parent = match self.with_tasks(|repo| repo.get(parent_id)) {
            Ok(parent) => parent,
            Err(err) if err.is_not_found() => {
                return Err(TaskError::DependencyNotSatisfied {
                    parent_id: parent_id.clone(),
                    status: "missing".to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        if parent.status != TaskStatus::Done {
            return Err(TaskError::DependencyNotSatisfied {
                parent_id: parent.id,
                status: parent.status.to_string(),
            });
        }
        Ok(Some(parent))
    }

    /// Stores `message` as the result of a failed task and reports it on the bus
    fn record_failure(&self, task: &Task, message: String) {
        if let Err(store_err) = self.with_tasks(|repo| {
            repo.update_status(&task.id, TaskStatus::Failed, Some(&message))
        }) {
            warn!("Could not record failure of task {}: {}", task.id, store_err);
        }
        self.events.publish(
            NewEvent::new(EventKind::Error, message)
                .with_agent(task.agent_id.clone())
                .with_task(task.id.clone()),
        );
    }

    fn publish(&self, agent: &Agent, task: &Task, kind: EventKind, content: String) {
        self.events.publish(
            NewEvent::new(kind, content)
                .with_agent(agent.id.clone())
                .with_task(task.id.clone()),
        );
    }

    fn with_tasks<T>(
        &self,
        f: impl FnOnce(&mut TaskRepository<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.database.get_conn()?;
        f(&mut TaskRepository::new(&mut conn))
    }

    fn with_agents<T>(
        &self,
        f: impl FnOnce(&mut AgentRepository<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.database.get_conn()?;
        f(&mut AgentRepository::new(&mut conn))
    }

    fn buffers(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.streaming.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Records a run as interrupted when it is dropped before being settled.
///
/// Also clears the streaming buffer of the task in every case.
struct RunGuard<'a> {
    executor: &'a TaskExecutor,
    task: &'a Task,
    settled: bool,
}

impl<'a> RunGuard<'a> {
    fn new(executor: &'a TaskExecutor, task: &'a Task) -> Self {
        Self {
            executor,
            task,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.executor.buffers().remove(&self.task.id);
        if !self.settled {
            warn!("Task {} was interrupted", self.task.id);
            self.executor
                .record_failure(self.task, INTERRUPTED_RESULT.to_string());
        }
    }
}
