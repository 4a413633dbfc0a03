use std::sync::Arc;

use axum::{Router, routing::get};

use crate::{
    ServerState,
    routes::{
        photo::{empty_reference_handler, photo_path_handler, photo_query_handler},
        status::{health_handler, status_handler},
    },
    service_layers::build_service_layers,
};

pub(crate) fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .route("/photo", get(photo_query_handler))
        .route("/photo/", get(empty_reference_handler))
        .route("/photo/{*reference}", get(photo_path_handler))
        .layer(build_service_layers())
        .with_state(state)
}
