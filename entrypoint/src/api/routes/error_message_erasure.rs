use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use photo_cache::PhotoError;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    QueryExtractorRejection(#[from] QueryRejection),
    #[error(transparent)]
    PathExtractorRejection(#[from] PathRejection),
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::QueryExtractorRejection(_) | Self::PathExtractorRejection(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            Self::Photo(err @ PhotoError::InvalidReference) => (StatusCode::BAD_REQUEST, err.kind()),
            Self::Photo(err @ PhotoError::NotFound) => (StatusCode::NOT_FOUND, err.kind()),
            Self::Photo(err) => (StatusCode::BAD_GATEWAY, err.kind()),
        }
    }
}

// callers only ever see the error kind, details stay in the logs
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::QueryExtractorRejection(rejection) => debug!(
                "Failed to parse incoming request: {}, {}",
                rejection.status(),
                rejection.body_text()
            ),
            Self::PathExtractorRejection(rejection) => debug!(
                "Failed to parse incoming request: {}, {}",
                rejection.status(),
                rejection.body_text()
            ),
            Self::Photo(_) => {}
        }

        let (status, kind) = self.status_and_kind();

        (status, Json(json!({ "error": kind }))).into_response()
    }
}
