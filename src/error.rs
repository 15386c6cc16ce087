//! Error types for the image service.
//!
//! Per-candidate failures (a bad download, an undecodable file) are normally
//! swallowed by the selector loop. What reaches the HTTP layer is rendered
//! as a short plain-text 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result alias used across the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Service error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting is missing or a value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// No album discovery strategy produced any candidate.
    #[error("album discovery failed: {0}")]
    Discovery(String),

    /// The fetched bytes are not a decodable image.
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The ditherer returned a different number of indices than pixels.
    #[error("dither mismatch: expected {expected} indices ({width}x{height}), got {actual}")]
    DitherMismatch {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
        /// `width * height`.
        expected: usize,
        /// Indices actually returned.
        actual: usize,
    },

    /// Every attempt of the selector loop was rejected.
    #[error("no usable image found after {attempts} attempts")]
    ExhaustedAttempts {
        /// Number of attempts made.
        attempts: usize,
    },

    /// Network failure talking to the album host.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// An external call did not finish within its time budget.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A stored value could not be serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding failure.
    #[error("png encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the error is worth retrying with another candidate.
    ///
    /// A dither mismatch is deterministic for a given configuration, so
    /// retrying would only reproduce it.
    pub const fn is_per_candidate(&self) -> bool {
        !matches!(self, Self::DitherMismatch { .. } | Self::Config(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let message = match &self {
            Self::Discovery(_) => "Failed to read the photo album",
            Self::ExhaustedAttempts { .. } => "Failed to find a usable image in the album",
            _ => "Internal Server Error",
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_dither_mismatch() {
        let err = Error::DitherMismatch {
            width: 800,
            height: 480,
            expected: 384_000,
            actual: 383_999,
        };
        assert_eq!(
            err.to_string(),
            "dither mismatch: expected 384000 indices (800x480), got 383999"
        );
    }

    #[test]
    fn dither_mismatch_is_not_retried() {
        let err = Error::DitherMismatch {
            width: 1,
            height: 1,
            expected: 1,
            actual: 0,
        };
        assert!(!err.is_per_candidate());
        assert!(Error::Timeout("image download").is_per_candidate());
    }

    #[test]
    fn into_response_is_500() {
        let response = Error::ExhaustedAttempts { attempts: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
