//! API routes configuration module

use crate::api::handlers::*;
use crate::core::Dashboard;
use axum::{
    routing::{get, post},
    Extension, Router,
};

/// Creates and configures the API router with all routes
///
/// # Arguments
/// * `dashboard` - Dashboard service shared across handlers
///
/// # Returns
/// * `Router` - Configured router with all API endpoints
pub fn app(dashboard: Dashboard) -> Router {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route(
            "/agents/:id",
            get(get_agent).put(update_agent).delete(delete_agent),
        )
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task).delete(delete_task))
        .route("/tasks/:id/execute", post(execute_task))
        .route("/tasks/:id/stream", get(stream_task))
        .route("/events", get(recent_events).delete(clear_events))
        .route("/events/stream", get(event_feed))
        .route("/models", get(list_models))
        .layer(Extension(dashboard))
}
