//! Failure kinds surfaced by the API client.

use std::path::PathBuf;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Every way a call to the remote API can fail.
///
/// The first three variants are the transport outcomes, checked in order:
/// network failure, undecodable body, non-200 status.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// DNS, connect, TLS or read failure, passed through untouched.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not JSON.
    #[error("invalid JSON response for {path}: {body}")]
    Decode { path: String, body: String },

    /// The body decoded but the status was not 200.
    #[error("API error {status} for {path}: {}", api_message(.body))]
    Api {
        path: String,
        status: StatusCode,
        headers: HeaderMap,
        body: Value,
    },

    /// An OAuth operation was called on a client holding a bearer token.
    #[error("client was not constructed with OAuth credentials")]
    MissingOAuth,

    /// The websocket grant carried no URL.
    #[error("websocket grant failed: {0}")]
    WebsocketGrant(String),

    #[error("websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading a local blob failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Server-provided description for API errors.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => server_message(body),
            _ => None,
        }
    }
}

/// `error_description`, falling back to `error`.
pub(crate) fn server_message(body: &Value) -> Option<&str> {
    body.get("error_description")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
}

fn api_message(body: &Value) -> String {
    match server_message(body) {
        Some(msg) => msg.to_string(),
        None => body.to_string(),
    }
}
