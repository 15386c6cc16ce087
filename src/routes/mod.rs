//! Route definitions for the image service.
//!
//! ## Routes
//!
//! - `GET /image` - The current dithered PNG
//! - `GET /health` - Health check (JSON)

mod current;
mod health;

use axum::Router;
use axum::routing::get;

use crate::state::AppState;

/// Build the complete service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/image", get(current::image_handler))
        .route("/health", get(health::health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::generator::ImageGenerator;
    use crate::models::ProcessedImage;
    use crate::paths::DataPaths;
    use crate::pregen::Pregenerator;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    struct FixedGenerator(Option<&'static [u8]>);

    #[async_trait]
    impl ImageGenerator for FixedGenerator {
        async fn generate(&self) -> Result<ProcessedImage> {
            self.0
                .map(|b| ProcessedImage::png(b.to_vec(), 1, 1))
                .ok_or(Error::ExhaustedAttempts { attempts: 10 })
        }
    }

    fn app(generator: FixedGenerator) -> (Router, TempDir) {
        let dir = tempdir().unwrap();
        let paths = DataPaths::create(dir.path()).unwrap();
        let pregen = Pregenerator::new(paths, Arc::new(generator));
        (router(AppState::new(pregen)), dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn image_has_caching_headers() {
        let (app, _dir) = app(FixedGenerator(Some(b"png-bytes")));
        let response = app.oneshot(get("/image")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert!(headers[header::ETAG].to_str().unwrap().starts_with("W/\"9-"));
        assert!(headers.contains_key(header::LAST_MODIFIED));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"png-bytes");
    }

    #[tokio::test]
    async fn matching_validators_get_304() {
        let (app, _dir) = app(FixedGenerator(Some(b"png-bytes")));
        let first = app.clone().oneshot(get("/image")).await.unwrap();
        let last_modified = first.headers()[header::LAST_MODIFIED].clone();
        let etag = first.headers()[header::ETAG].clone();

        // The background regeneration may have replaced the file; only
        // compare against what the next response reports
        let by_date = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/image")
                    .header(header::IF_MODIFIED_SINCE, last_modified.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        if by_date.headers()[header::LAST_MODIFIED] == last_modified {
            assert_eq!(by_date.status(), StatusCode::NOT_MODIFIED);
        } else {
            assert_eq!(by_date.status(), StatusCode::OK);
        }

        let by_tag = app
            .oneshot(
                Request::builder()
                    .uri("/image")
                    .header(header::IF_NONE_MATCH, "\"other\", *")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(by_tag.status(), StatusCode::NOT_MODIFIED);
        assert!(!etag.is_empty());
    }

    #[tokio::test]
    async fn stale_date_gets_full_response() {
        let (app, _dir) = app(FixedGenerator(Some(b"png-bytes")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/image")
                    .header(header::IF_MODIFIED_SINCE, "Thu, 01 Jan 1970 00:00:00 GMT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn generation_failure_is_500() {
        let (app, _dir) = app(FixedGenerator(None));
        let response = app.oneshot(get("/image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Failed to find a usable image in the album");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _dir) = app(FixedGenerator(None));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "inkalbum");
    }
}
