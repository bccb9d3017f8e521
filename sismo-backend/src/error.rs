//! Error taxonomy for the monitoring pipeline and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The event source could not be read this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to event source timed out")]
    Timeout,

    #[error("event source returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("event source request failed: {0}")]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e)
        }
    }
}

/// Subscriber/feedback store unreachable or write rejected.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single chunk could not be delivered to the push provider.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push request timed out")]
    Timeout,

    #[error("push provider returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("push provider rejected the request: {0}")]
    Provider(String),

    #[error("push provider returned {got} tickets for {expected} messages")]
    TicketCountMismatch { expected: usize, got: usize },

    #[error("push request failed: {0}")]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchError::Timeout
        } else {
            DispatchError::Request(e)
        }
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("token {0} is not a valid push token")]
    InvalidToken(String),

    #[error("token not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidToken(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Store(e) => tracing::error!("Store error while handling request: {}", e),
            other => tracing::warn!("Request rejected: {}", other),
        }
        status.into_response()
    }
}
