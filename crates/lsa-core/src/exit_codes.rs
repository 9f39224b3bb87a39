//! Process exit codes for the CLI.
//!
//! Exit codes communicate outcome without requiring output parsing.
//!
//! Ranges:
//! - 0: clean success
//! - 10-19: user/environment errors (recoverable by user action)
//! - 20-29: backend/runtime errors
//! - 30-39: interruption

use lsa_common::{Error, ErrorCategory};

/// Exit codes for `lsa` operations. Stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Analysis ran to completion.
    Clean = 0,

    /// Invalid arguments or request.
    ArgsError = 10,

    /// Dataset file missing or unreadable.
    InputError = 11,

    /// Query execution failed or timed out.
    QueryError = 20,

    /// Stream serialization or transport failure.
    StreamError = 21,

    /// Internal error (bug, please report).
    InternalError = 22,

    /// Run cancelled before completion.
    Interrupted = 30,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Stable name for machine-readable output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::QueryError => "ERR_QUERY",
            ExitCode::StreamError => "ERR_STREAM",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::Interrupted => "ERR_INTERRUPTED",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        if err.is_cancellation() {
            return ExitCode::Interrupted;
        }
        match err.category() {
            ErrorCategory::Request => ExitCode::ArgsError,
            ErrorCategory::Query => ExitCode::QueryError,
            ErrorCategory::Stream => ExitCode::StreamError,
            ErrorCategory::Io => ExitCode::InputError,
            ErrorCategory::Session => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_only_for_clean() {
        assert!(ExitCode::Clean.is_success());
        assert!(!ExitCode::ArgsError.is_success());
        assert!(!ExitCode::Interrupted.is_success());
    }

    #[test]
    fn test_error_mapping() {
        let err = Error::InvalidRequest("bad".into());
        assert_eq!(ExitCode::from(&err), ExitCode::ArgsError);

        let err = Error::QueryExecution("boom".into());
        assert_eq!(ExitCode::from(&err), ExitCode::QueryError);

        let err = Error::Cancelled;
        assert_eq!(ExitCode::from(&err), ExitCode::Interrupted);

        let err = Error::Serialization("oops".into());
        assert_eq!(ExitCode::from(&err), ExitCode::StreamError);
    }

    #[test]
    fn test_broken_pipe_counts_as_interrupted() {
        let err = Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(ExitCode::from(&err), ExitCode::Interrupted);
    }

    #[test]
    fn test_display_includes_name_and_number() {
        assert_eq!(ExitCode::Clean.to_string(), "OK (0)");
        assert_eq!(ExitCode::QueryError.to_string(), "ERR_QUERY (20)");
    }
}
