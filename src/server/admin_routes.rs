//! Background job administration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::state::{OptionalSchedulerHandle, ServerState};
use crate::background_jobs::JobError;

fn scheduler_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": "job scheduler is not running" })),
    )
        .into_response()
}

async fn list_jobs(State(scheduler): State<OptionalSchedulerHandle>) -> Response {
    match scheduler {
        Some(handle) => Json(handle.list_jobs().await).into_response(),
        None => scheduler_unavailable(),
    }
}

async fn trigger_job(
    State(scheduler): State<OptionalSchedulerHandle>,
    Path(job_id): Path<String>,
) -> Response {
    let Some(handle) = scheduler else {
        return scheduler_unavailable();
    };

    match handle.trigger_job(&job_id).await {
        Ok(()) => {
            info!("Job {} triggered over HTTP", job_id);
            StatusCode::ACCEPTED.into_response()
        }
        Err(err) => {
            let status = match err {
                JobError::NotFound => StatusCode::NOT_FOUND,
                JobError::AlreadyRunning => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
        }
    }
}

pub fn make_admin_routes(state: ServerState) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}/trigger", post(trigger_job))
        .with_state(state)
}
