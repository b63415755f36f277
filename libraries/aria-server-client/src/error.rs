//! Error types for the media server client.

use aria_core::RemoteError;
use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Errors that can occur when talking to a media server.
#[derive(Error, Debug)]
pub enum ServerClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Authentication required but no token available, or token rejected
    #[error("Authentication required")]
    AuthRequired,

    /// Login rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error while writing a download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server is offline or unreachable
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    /// Rate limited by server
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },
}

impl ServerClientError {
    /// Classify a transport failure
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ServerUnreachable(err.to_string())
        } else {
            Self::Request(err)
        }
    }

    /// Turn a non-success response into an error
    pub(crate) async fn from_response(response: Response, what: &str) -> Self {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::AuthRequired,
            StatusCode::NOT_FOUND => Self::NotFound(what.to_string()),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                Self::RateLimited { retry_after_secs }
            }
            _ => Self::ServerError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            },
        }
    }
}

impl From<ServerClientError> for RemoteError {
    fn from(err: ServerClientError) -> Self {
        match err {
            ServerClientError::AuthRequired | ServerClientError::AuthFailed(_) => Self::AuthRequired,
            ServerClientError::NotFound(what) => Self::NotFound(what),
            ServerClientError::ServerError { status, message } => Self::Server { status, message },
            ServerClientError::RateLimited { retry_after_secs } => Self::Server {
                status: 429,
                message: format!("retry after {retry_after_secs}s"),
            },
            ServerClientError::Request(e) if e.is_decode() => Self::Parse(e.to_string()),
            ServerClientError::Request(e) => Self::Network(e.to_string()),
            ServerClientError::ServerUnreachable(msg) => Self::Network(msg),
            ServerClientError::ParseError(msg) | ServerClientError::InvalidUrl(msg) => {
                Self::Parse(msg)
            }
            ServerClientError::Io(e) => Self::Io(e.to_string()),
        }
    }
}

/// Result type for server client operations.
pub type Result<T> = std::result::Result<T, ServerClientError>;
