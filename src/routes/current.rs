//! The image endpoint polled by the frame.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::error::Result;
use crate::pregen::ServedImage;
use crate::state::AppState;

/// Serve the current image and schedule the next one.
///
/// Returns `304` when the client already holds this exact artifact.
pub async fn image_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let served = state.pregen.serve_current().await?;
    let last_modified = served.last_modified_header();

    if is_not_modified(&headers, &served, &last_modified) {
        tracing::debug!(etag = %served.etag, "Client copy is current");
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (header::ETAG, served.etag),
                (header::LAST_MODIFIED, last_modified),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
        )
            .into_response());
    }

    tracing::info!(bytes = served.bytes.len(), "Serving image");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (header::ETAG, served.etag),
            (header::LAST_MODIFIED, last_modified),
        ],
        Body::from(served.bytes),
    )
        .into_response())
}

/// `If-None-Match` takes precedence; `If-Modified-Since` must match the
/// formatted `Last-Modified` exactly.
fn is_not_modified(headers: &HeaderMap, served: &ServedImage, last_modified: &str) -> bool {
    if let Some(tags) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        return tags
            .split(',')
            .any(|t| t.trim() == served.etag || t.trim() == "*");
    }

    headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|since| since.trim() == last_modified)
}
