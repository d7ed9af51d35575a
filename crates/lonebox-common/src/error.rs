//! Unified error types for the Lonebox workspace.
//!
//! Every operation on the managed container resolves to either a value or a
//! [`LoneboxError`]. The HTTP facade maps [`ErrorKind`] onto status codes, so
//! adding a variant here means deciding how clients will see it.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ContainerState;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum LoneboxError {
    /// The requested operation is illegal in the current lifecycle state.
    #[error("cannot {operation} while container is {state}")]
    InvalidState {
        /// Operation that was refused.
        operation: &'static str,
        /// State the managed container was in.
        state: ContainerState,
    },

    /// A call into the container engine failed.
    #[error("engine {operation} failed: {message}")]
    Engine {
        /// Engine call that failed.
        operation: &'static str,
        /// Error reported by the engine client.
        message: String,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline that was exceeded.
        after: Duration,
    },

    /// A request carried malformed or unacceptable input.
    #[error("invalid request: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl LoneboxError {
    /// Builds an [`LoneboxError::Engine`] from any displayable cause.
    pub fn engine(operation: &'static str, cause: impl fmt::Display) -> Self {
        Self::Engine {
            operation,
            message: cause.to_string(),
        }
    }

    /// Classifies the error for clients.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Engine { .. } => ErrorKind::Engine,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Validation { .. } | Self::Serialization { .. } => ErrorKind::Validation,
            Self::Config { .. } | Self::Io { .. } => ErrorKind::Internal,
        }
    }
}

/// Client-facing error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation illegal for the current lifecycle state.
    InvalidState,
    /// The container engine reported a failure.
    Engine,
    /// A deadline was exceeded.
    Timeout,
    /// The request was malformed.
    Validation,
    /// The route does not exist.
    NotFound,
    /// The route exists but not for this HTTP method.
    MethodNotAllowed,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name carried in JSON error bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidState => "invalid_state",
            Self::Engine => "engine_error",
            Self::Timeout => "timeout",
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LoneboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_operation_and_state() {
        let err = LoneboxError::InvalidState {
            operation: "run",
            state: ContainerState::Removed,
        };
        assert_eq!(err.to_string(), "cannot run while container is removed");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn timeout_reports_whole_seconds() {
        let err = LoneboxError::Timeout {
            operation: "exec",
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "exec timed out after 5s");
        assert_eq!(err.kind().as_str(), "timeout");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err: LoneboxError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn engine_helper_keeps_cause_text() {
        let err = LoneboxError::engine("start", "no such image");
        assert_eq!(err.to_string(), "engine start failed: no such image");
        assert_eq!(err.kind().as_str(), "engine_error");
    }
}
