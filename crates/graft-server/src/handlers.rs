//! Request handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use graft_core::{ChangeBatch, Changeset};
use graft_scheduler::StateSnapshot;
use serde::Serialize;

use crate::ServerState;

/// The scheduler answers only once startup syncs are done.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<StateSnapshot>,
}

/// Accept a delta notification and queue it for the next sync run. The
/// response never reflects how processing goes.
pub async fn receive_delta(
    State(state): State<Arc<ServerState>>,
    Json(changesets): Json<Vec<Changeset>>,
) -> StatusCode {
    let batch = ChangeBatch::new(changesets);
    tracing::debug!(
        "Received {} changesets with {} triples",
        batch.changesets.len(),
        batch.triple_count()
    );

    if let Err(e) = state.scheduler.notify(batch) {
        tracing::error!("Dropping delta notification: {}", e);
    }
    StatusCode::ACCEPTED
}

pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match tokio::time::timeout(SNAPSHOT_TIMEOUT, state.scheduler.snapshot()).await {
        Ok(Ok(snapshot)) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                version: state.version.clone(),
                scheduler: Some(snapshot),
            }),
        ),
        Ok(Err(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "scheduler stopped".to_string(),
                version: state.version.clone(),
                scheduler: None,
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "starting".to_string(),
                version: state.version.clone(),
                scheduler: None,
            }),
        ),
    }
}
