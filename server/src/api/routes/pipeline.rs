//! Pipeline trigger and status endpoints
//!
//! All three triggers share the pipeline's single reentrancy guard; an
//! overlapping request gets a "Pipeline already running" message rather
//! than a second concurrent run. Handlers only read status; the
//! orchestrator owns it.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::news::{NewsPipeline, StatusSnapshot};

#[derive(Clone)]
pub struct PipelineApiState {
    pub pipeline: Arc<NewsPipeline>,
}

/// Response for the trigger endpoints
#[derive(Serialize, Default, ToSchema)]
pub struct CollectResponse {
    pub collected: usize,
    pub analyzed: usize,
    pub message: String,
}

/// Build the pipeline routes
pub fn routes(pipeline: Arc<NewsPipeline>) -> Router {
    let state = PipelineApiState { pipeline };

    Router::new()
        .route("/collect", post(trigger_collect))
        .route("/analyze", post(trigger_analyze))
        .route("/archive", post(trigger_archive))
        .route("/status", get(get_status))
        .with_state(state)
}

/// Run collect + analyze synchronously
#[utoipa::path(
    post,
    path = "/collect",
    tag = "pipeline",
    responses(
        (status = 200, description = "Collection result", body = CollectResponse)
    )
)]
pub async fn trigger_collect(State(state): State<PipelineApiState>) -> Json<CollectResponse> {
    match state.pipeline.trigger_collect().await {
        Ok(outcome) => Json(CollectResponse {
            collected: outcome.collected,
            analyzed: outcome.analyzed,
            message: format!(
                "Collected {}, analyzed {} articles",
                outcome.collected, outcome.analyzed
            ),
        }),
        Err(busy) => Json(CollectResponse {
            message: busy.to_string(),
            ..Default::default()
        }),
    }
}

/// Run the analyzer over already-collected entries
#[utoipa::path(
    post,
    path = "/analyze",
    tag = "pipeline",
    responses(
        (status = 200, description = "Analysis result", body = CollectResponse)
    )
)]
pub async fn trigger_analyze(State(state): State<PipelineApiState>) -> Json<CollectResponse> {
    match state.pipeline.trigger_analyze().await {
        Ok(analyzed) => Json(CollectResponse {
            analyzed,
            message: format!("Analyzed {analyzed} articles"),
            ..Default::default()
        }),
        Err(busy) => Json(CollectResponse {
            message: busy.to_string(),
            ..Default::default()
        }),
    }
}

/// Run the vector archiver
#[utoipa::path(
    post,
    path = "/archive",
    tag = "pipeline",
    responses(
        (status = 200, description = "Archive result", body = CollectResponse)
    )
)]
pub async fn trigger_archive(State(state): State<PipelineApiState>) -> Json<CollectResponse> {
    match state.pipeline.trigger_archive().await {
        Ok(archived) => Json(CollectResponse {
            message: format!("Archived {archived} articles"),
            ..Default::default()
        }),
        Err(busy) => Json(CollectResponse {
            message: busy.to_string(),
            ..Default::default()
        }),
    }
}

/// Pipeline status snapshot
#[utoipa::path(
    get,
    path = "/status",
    tag = "pipeline",
    responses(
        (status = 200, description = "Cycle counters and last-run timestamps", body = StatusSnapshot)
    )
)]
pub async fn get_status(State(state): State<PipelineApiState>) -> Json<StatusSnapshot> {
    Json(state.pipeline.status())
}
