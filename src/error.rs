//! Error types for the aggregator

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Result type alias for the aggregator
pub type Result<T> = std::result::Result<T, Error>;

/// Aggregator errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or disallowed request parameter
    #[error("{0}")]
    InvalidParam(String),

    /// URL rejected by the reader's host policy
    #[error("{0}")]
    BlockedUrl(String),

    /// Upstream reported the resource as absent
    #[error("item not found")]
    NotFound,

    /// Upstream answered with a non-success status
    #[error("upstream request failed ({0})")]
    UpstreamStatus(u16),

    /// Upstream request exceeded its deadline
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// Upstream JSON body exceeded the decode cap
    #[error("upstream response exceeded size limit")]
    UpstreamOversized,

    /// Reader article body exceeded the streaming cap
    #[error("article exceeded size limit")]
    TooLarge,

    /// Reader target did not return an HTML document
    #[error("URL did not return HTML")]
    UnsupportedMedia,

    /// Readability produced neither content nor text
    #[error("article content was empty")]
    EmptyArticle,

    /// Readability failed to parse the document
    #[error("failed to extract article")]
    Extract,

    /// Hostname resolution failed
    #[error("failed to resolve host: {0}")]
    Resolve(String),

    /// Transport error
    #[error("transport error: {0}")]
    Http(reqwest::Error),

    /// JSON decode error
    #[error("decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a `reqwest` failure, surfacing deadline expiry as its own
    /// kind so the handler layer can answer 504 instead of 502.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else {
            Self::Http(err)
        }
    }

    /// HTTP status this error maps to at the handler boundary.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParam(_) | Self::BlockedUrl(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            // Explicit upstream 404/502 pass through; every other upstream
            // status collapses to 502 at the edge.
            Self::UpstreamStatus(404) => StatusCode::NOT_FOUND,
            Self::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UpstreamOversized
            | Self::EmptyArticle
            | Self::Extract
            | Self::Resolve(_)
            | Self::Http(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short human-readable message for the response envelope. Transport
    /// and decode details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Http(_) => "failed to reach upstream".to_string(),
            Self::Json(_) => "failed to decode upstream response".to_string(),
            Self::Io(_) | Self::Internal(_) => "internal error".to_string(),
            Self::Resolve(_) => "failed to resolve host".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
