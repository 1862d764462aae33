use crate::agents::{Agent, AgentDraft};
use crate::api::errors::ApiError;
use crate::core::{Dashboard, Task, TaskDraft, TaskStatus};
use crate::db::SortOrder;
use crate::event::StreamEvent;
use crate::llm::models::{known_models, ModelSpec};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the agent list
#[derive(Debug, Default, Deserialize)]
pub struct AgentListQuery {
    #[serde(default)]
    pub order: SortOrder,
}

/// Query parameters accepted by the task list
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub order: SortOrder,
}

/// Query parameters of the live event feed
#[derive(Debug, Default, Deserialize)]
pub struct EventFeedQuery {
    /// Send the retained history before live events
    #[serde(default)]
    pub replay: bool,
}

/// Transient output of a task, present only while it streams
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamingOutput {
    pub task_id: String,
    pub output: Option<String>,
}

pub async fn list_agents(
    Query(query): Query<AgentListQuery>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(dashboard.list_agents(query.order)?))
}

/// Creates an agent
///
/// # Arguments
/// * `dashboard` - Shared dashboard service
/// * `payload` - Name, role, prompt, model and optional lists of the agent
///
/// # Returns
/// * `Result<(StatusCode, Json<Agent>), ApiError>` - The stored agent or error
#[axum::debug_handler]
pub async fn create_agent(
    Extension(dashboard): Extension<Dashboard>,
    Json(payload): Json<AgentDraft>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = dashboard.create_agent(payload)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(dashboard.get_agent(&id)?))
}

pub async fn update_agent(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
    Json(payload): Json<AgentDraft>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(dashboard.update_agent(&id, payload)?))
}

pub async fn delete_agent(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<StatusCode, ApiError> {
    dashboard.delete_agent(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tasks(
    Query(query): Query<TaskListQuery>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(dashboard.list_tasks(query.status, query.order)?))
}

#[axum::debug_handler]
pub async fn create_task(
    Extension(dashboard): Extension<Dashboard>,
    Json(payload): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = dashboard.create_task(payload)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(dashboard.get_task(&id)?))
}

pub async fn delete_task(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<StatusCode, ApiError> {
    dashboard.delete_task(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs a task to completion
///
/// The response is sent once the task is `done`; a failed run answers with
/// the error while the task itself keeps the `Error: ...` result.
#[axum::debug_handler]
pub async fn execute_task(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(dashboard.execute_task(&id).await?))
}

pub async fn stream_task(
    Path(id): Path<String>,
    Extension(dashboard): Extension<Dashboard>,
) -> Result<Json<StreamingOutput>, ApiError> {
    let output = dashboard.streaming_output(&id)?;
    Ok(Json(StreamingOutput { task_id: id, output }))
}

pub async fn recent_events(Extension(dashboard): Extension<Dashboard>) -> Json<Vec<StreamEvent>> {
    Json(dashboard.recent_events())
}

/// Live event feed as server-sent events
///
/// Each bus event is sent as JSON under its kind as the SSE event name. The
/// subscription ends when the client goes away.
pub async fn event_feed(
    Query(query): Query<EventFeedQuery>,
    Extension(dashboard): Extension<Dashboard>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let feed = dashboard.events().subscribe_channel(query.replay);
    let events = stream::unfold(feed, |(subscription, mut receiver)| async move {
        let event = receiver.recv().await?;
        let sse = Event::default().event(event.kind.to_string()).json_data(&event);
        Some((sse, (subscription, receiver)))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn clear_events(Extension(dashboard): Extension<Dashboard>) -> StatusCode {
    dashboard.clear_events();
    StatusCode::NO_CONTENT
}

pub async fn list_models() -> Json<&'static [ModelSpec]> {
    Json(known_models())
}
