// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! The error taxonomy the daemon's REST and WebSocket surfaces speak.
//! `ApiError` is the only error shape that crosses the
//! boundary to a client; everything upstream (subprocess failures,
//! filesystem errno values) is folded into one of these variants before
//! it reaches a handler.

use serde::Serialize;
use thiserror::Error;

/// A user-facing error, carrying enough to render the `{error, message,
/// action}` envelope.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("session id is not shaped like a UUID")]
    InvalidSessionId,

    #[error("no such session")]
    NotFound,

    #[error("session already has an active terminal connection")]
    SessionAttached,

    #[error("a host-side process is already resuming this session")]
    SessionConflict,

    #[error("maximum number of multiplexer tabs reached")]
    MaxSessions,

    #[error("attach attempted too soon after a previous attach")]
    RateLimited,

    /// Anything that doesn't fit the taxonomy above: binary missing,
    /// permission denied, an I/O error with no meaningful recovery.
    /// Never exposes its message verbatim to the client: raw subprocess
    /// exit codes and filesystem errno values never reach the API,
    /// logged internally instead.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// The stable machine-readable code in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidSessionId => "INVALID_SESSION_ID",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::SessionAttached => "SESSION_ATTACHED",
            ApiError::SessionConflict => "SESSION_CONFLICT",
            ApiError::MaxSessions => "MAX_SESSIONS",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized => 401,
            ApiError::InvalidSessionId => 400,
            ApiError::NotFound => 404,
            ApiError::SessionAttached | ApiError::SessionConflict | ApiError::MaxSessions => 409,
            ApiError::RateLimited => 429,
            ApiError::Internal(_) => 500,
        }
    }

    /// The WebSocket close code for errors that can occur during the
    /// `/terminal/:id` upgrade or an open connection.
    pub fn ws_close_code(&self) -> u16 {
        match self {
            ApiError::Unauthorized => 4401,
            ApiError::SessionAttached => 4409,
            _ => 4500,
        }
    }

    /// A short hint for the client's `action` field. Intentionally terse;
    /// clients render this verbatim.
    pub fn action(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "retry with a valid Authorization header",
            ApiError::InvalidSessionId => "check the session id and retry",
            ApiError::NotFound => "refresh the session list",
            ApiError::SessionAttached => "close the existing terminal connection first",
            ApiError::SessionConflict => "stop the conflicting host-side process first",
            ApiError::MaxSessions => "detach an existing session before creating a new one",
            ApiError::RateLimited => "wait before retrying the attach",
            ApiError::Internal(_) => "retry later; if this persists, check the daemon log",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.code(),
            message: self.to_string(),
            action: self.action(),
        }
    }
}

/// The wire shape of every non-2xx response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub message: String,
    pub action: &'static str,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
