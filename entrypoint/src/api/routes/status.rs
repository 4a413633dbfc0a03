use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::ServerState;

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    cache_size: usize,
}

pub(crate) async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "running",
        cache_size: state.proxy.cache_size().await,
    })
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
