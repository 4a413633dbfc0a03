use std::sync::Arc;

use crate::{ServerState, routes::error_message_erasure::ApiError};

use axum::body::Body;
use axum::debug_handler;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::{extract::State, response::IntoResponse, response::Response};
use axum_extra::extract::WithRejection;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use photo_cache::{PhotoError, PhotoLookup};
use serde::Deserialize;
use sha2::{Digest, Sha256};

const UNBOUNDED_CACHE_MAX_AGE_SECS: u64 = 24 * 60 * 60;

// extra params are ignored, the UI appends cache busters
#[derive(Deserialize)]
pub(crate) struct Payload {
    key: String,
}

#[debug_handler]
pub(crate) async fn photo_path_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    WithRejection(Path(reference), _): WithRejection<Path<String>, ApiError>,
) -> Result<Response, ApiError> {
    serve_photo(&state, &headers, &reference).await
}

/// Same as the path form, for references that arrive URL-encoded in `?key=`
#[debug_handler]
pub(crate) async fn photo_query_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    WithRejection(Query(query), _): WithRejection<Query<Payload>, ApiError>,
) -> Result<Response, ApiError> {
    serve_photo(&state, &headers, &query.key).await
}

// `/photo/` with nothing after it
pub(crate) async fn empty_reference_handler() -> ApiError {
    ApiError::Photo(PhotoError::InvalidReference)
}

async fn serve_photo(
    state: &ServerState,
    request_headers: &HeaderMap,
    reference: &str,
) -> Result<Response, ApiError> {
    let PhotoLookup { photo, cache_hit } = state.proxy.fetch_photo(reference).await?;

    let etag = entity_tag(&photo.image);
    let max_age = state
        .proxy
        .cache_ttl()
        .map_or(UNBOUNDED_CACHE_MAX_AGE_SECS, |ttl| ttl.as_secs());

    let mut response = if if_none_match(request_headers, &etag) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        ([(header::CONTENT_TYPE, photo.mime_type)], Body::from(photo.image)).into_response()
    };

    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("public, max-age={max_age}"))
            .unwrap_or(HeaderValue::from_static("public")),
    );
    response_headers.insert(
        "x-cache",
        HeaderValue::from_static(if cache_hit { "HIT" } else { "MISS" }),
    );
    if let Ok(etag) = HeaderValue::from_str(&etag) {
        response_headers.insert(header::ETAG, etag);
    }

    Ok(response)
}

fn entity_tag(image: &[u8]) -> String {
    format!("\"{}\"", URL_SAFE_NO_PAD.encode(Sha256::digest(image)))
}

fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == etag || candidate == "*")
        })
}
