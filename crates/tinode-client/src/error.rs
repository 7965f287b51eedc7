//! Error types for the session engine.
//!
//! Operator mistakes (bad flags, unknown commands) are never errors here:
//! they are rendered as text for the operator. These types cover the
//! failures the caller has to act on.

use std::io;

use thiserror::Error;

use crate::connection::TransportError;

/// Errors from the completion registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// A callback is already pending for this request id
    #[error("completion already registered for request {0}")]
    AlreadyRegistered(String),
}

/// Errors from reading or writing the cookie file.
#[derive(Error, Debug)]
pub enum CookieError {
    /// File could not be read or written
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] io::Error),

    /// File content, or a parameter being saved, is not valid JSON
    #[error("cookie is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File holds no `token` string
    #[error("cookie has no token")]
    MissingToken,
}

/// Errors that end a session run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Terminal write failed
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Stream failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
