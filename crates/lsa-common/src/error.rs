//! Error types for Log Spike Analysis.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers that retry
//!
//! Cancellation is modeled as an error variant so it can travel through
//! `?` chains, but it is not a failure: the streaming layer must never
//! emit an `error` action for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Log Spike Analysis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request validation errors (malformed windows, empty candidates).
    Request,
    /// Query executor failures (backend aggregation calls).
    Query,
    /// Session lifecycle errors (cancellation, invalid state transitions).
    Session,
    /// Action stream encoding and transport errors.
    Stream,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Request => write!(f, "request"),
            ErrorCategory::Query => write!(f, "query"),
            ErrorCategory::Session => write!(f, "session"),
            ErrorCategory::Stream => write!(f, "stream"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Log Spike Analysis.
#[derive(Error, Debug)]
pub enum Error {
    // Request errors (10-19)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Query executor errors (20-29)
    #[error("query execution failed: {0}")]
    QueryExecution(String),

    #[error("query timed out after {millis}ms")]
    QueryTimeout { millis: u64 },

    // Session errors (30-39)
    #[error("analysis cancelled")]
    Cancelled,

    #[error("invalid session state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // Stream errors (40-49)
    #[error("action serialization failed: {0}")]
    Serialization(String),

    #[error("action stream already closed")]
    StreamClosed,

    // I/O errors (50-59)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Error codes are grouped by category:
    /// - 10-19: Request errors
    /// - 20-29: Query executor errors
    /// - 30-39: Session errors
    /// - 40-49: Stream errors
    /// - 50-59: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidRequest(_) => 10,
            Error::QueryExecution(_) => 20,
            Error::QueryTimeout { .. } => 21,
            Error::Cancelled => 30,
            Error::InvalidTransition { .. } => 31,
            Error::Serialization(_) => 40,
            Error::StreamClosed => 41,
            Error::Io(_) => 50,
            Error::Json(_) => 51,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidRequest(_) => ErrorCategory::Request,
            Error::QueryExecution(_) | Error::QueryTimeout { .. } => ErrorCategory::Query,
            Error::Cancelled | Error::InvalidTransition { .. } => ErrorCategory::Session,
            Error::Serialization(_) | Error::StreamClosed => ErrorCategory::Stream,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the caller may reasonably retry the operation.
    ///
    /// The engine itself never retries; retry policy belongs to the
    /// query executor or the calling service.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidRequest(_) => false,
            Error::QueryExecution(_) => false,
            Error::QueryTimeout { .. } => true,
            Error::Cancelled => false,
            Error::InvalidTransition { .. } => false,
            Error::Serialization(_) => false,
            Error::StreamClosed => false,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Whether this error represents silent session abandonment.
    ///
    /// Cancelled sessions terminate without an `error` action on the wire.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
            || matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., field name, session id).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        if let Error::QueryTimeout { millis } = err {
            context.insert("timeout_ms".to_string(), serde_json::json!(millis));
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
