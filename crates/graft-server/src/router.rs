//! Axum router setup

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    ServerState,
    handlers::{health_check, receive_delta},
};

pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/delta", post(receive_delta))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
