//! Error types for the tunnel binary.
//!
//! Split the same way `PlayersError` was in the teacher crate: one enum for
//! mistakes an HTTP caller can make (turned into a response by
//! `IntoResponse`), one for failures that abort the process before the
//! server is even listening.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced while servicing a single `/aiotunnel` request.
///
/// Per the documented API, an unknown or already-closed `cid` on PUT/GET/
/// DELETE is not an error at all: handlers return `200` with an empty body
/// directly and never construct this variant for that case.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("malformed target address: {0}")]
    MalformedTarget(String),

    #[error("failed to connect to target {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to listen on {addr}: {source}")]
    ListenFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cid pool exhausted, collision on generated identifier")]
    CidCollision,
}

impl IntoResponse for TunnelError {
    fn into_response(self) -> Response {
        let status = match &self {
            TunnelError::MalformedTarget(_) => StatusCode::BAD_REQUEST,
            TunnelError::ConnectFailed { .. } => StatusCode::BAD_GATEWAY,
            TunnelError::ListenFailed { .. } => StatusCode::BAD_GATEWAY,
            TunnelError::CidCollision => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failures that prevent the process from ever reaching its serve loop:
/// bad CLI combinations, unreadable TLS material, a socket we can't bind.
/// All of these map to an `eprintln!` plus exit code 1 in `main`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build TLS config: {0}")]
    TlsConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("logging setup failed: {0}")]
    Logging(String),
}
