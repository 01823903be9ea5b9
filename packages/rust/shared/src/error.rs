//! Error types for the GERBIL adapter.
//!
//! Library crates use [`GerbilError`] via `thiserror`.
//! The binary wraps this with `color-eyre` for rich diagnostics and maps it
//! onto HTTP status codes at the server boundary.

use std::path::PathBuf;

/// Top-level error type for all adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum GerbilError {
    /// The generated endpoint URL is not a syntactically valid URI.
    #[error("malformed endpoint: {message}")]
    MalformedEndpoint { message: String },

    /// The orchestration service could not be reached (transport failure or timeout).
    #[error("pipeline unreachable: {message}")]
    PipelineUnreachable { message: String, timed_out: bool },

    /// The orchestration service answered with something other than a run descriptor.
    #[error("invalid pipeline response: {0}")]
    InvalidPipelineResponse(String),

    /// The textual representation of the question could not be retrieved.
    #[error("missing question text: {0}")]
    MissingQuestionText(String),

    /// A non-empty answer payload that is not a JSON object.
    #[error("malformed answer payload: {0}")]
    MalformedAnswerPayload(String),

    /// A result-store query failed while extracting artifacts.
    #[error("result store error: {0}")]
    ResultStore(String),

    /// Inbound request validation error (empty question, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GerbilError>;

impl GerbilError {
    /// Create a malformed-endpoint error from any displayable message.
    pub fn malformed_endpoint(msg: impl Into<String>) -> Self {
        Self::MalformedEndpoint {
            message: msg.into(),
        }
    }

    /// Create a pipeline-unreachable error for a transport failure.
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::PipelineUnreachable {
            message: msg.into(),
            timed_out: false,
        }
    }

    /// Create a pipeline-unreachable error for a call that exceeded its timeout.
    pub fn timed_out(msg: impl Into<String>) -> Self {
        Self::PipelineUnreachable {
            message: msg.into(),
            timed_out: true,
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the request itself was bad, as opposed to an upstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::MalformedEndpoint { .. })
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedEndpoint { .. } => "MALFORMED_ENDPOINT",
            Self::PipelineUnreachable { .. } => "PIPELINE_UNREACHABLE",
            Self::InvalidPipelineResponse(_) => "INVALID_PIPELINE_RESPONSE",
            Self::MissingQuestionText(_) => "MISSING_QUESTION_TEXT",
            Self::MalformedAnswerPayload(_) => "MALFORMED_ANSWER_PAYLOAD",
            Self::ResultStore(_) => "RESULT_STORE_FAILURE",
            Self::Validation { .. } => "BAD_REQUEST",
            Self::Config { .. } => "CONFIG",
            Self::Io { .. } => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = GerbilError::malformed_endpoint("port must be non-zero");
        assert_eq!(err.to_string(), "malformed endpoint: port must be non-zero");

        let err = GerbilError::validation("question must not be empty");
        assert!(err.to_string().contains("question must not be empty"));
    }

    #[test]
    fn client_errors_are_distinguished_from_upstream_failures() {
        assert!(GerbilError::validation("empty").is_client_error());
        assert!(GerbilError::malformed_endpoint("bad host").is_client_error());
        assert!(!GerbilError::unreachable("connection refused").is_client_error());
        assert!(!GerbilError::MissingQuestionText("no raw data".into()).is_client_error());
    }

    #[test]
    fn timeout_flag_is_kept() {
        match GerbilError::timed_out("deadline elapsed") {
            GerbilError::PipelineUnreachable { timed_out, .. } => assert!(timed_out),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(GerbilError::timed_out("x").code(), "PIPELINE_UNREACHABLE");
    }
}
