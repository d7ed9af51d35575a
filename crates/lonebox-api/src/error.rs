//! Error kind to HTTP status mapping.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use lonebox_common::error::{ErrorKind, LoneboxError};

use crate::types::ErrorBody;

/// Error returned by handlers, rendered as `{"error", "kind"}`.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            status: status_for(kind),
            message,
        }
    }

    /// Error for a route that does not exist.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("no route for {path}"))
    }

    /// Error for a known route called with the wrong method.
    #[must_use]
    pub fn method_not_allowed(method: &Method, path: &str) -> Self {
        Self::new(
            ErrorKind::MethodNotAllowed,
            format!("{method} is not allowed on {path}"),
        )
    }

    /// Client-facing classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }
}

/// Unreadable bodies keep the rejection's status (e.g. `413`).
impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self {
            kind: ErrorKind::Validation,
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// HTTP status used for each error kind.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::Engine => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LoneboxError> for ApiError {
    fn from(err: LoneboxError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status.is_server_error() {
            tracing::warn!(kind = %self.kind, error = %self.message, "request failed");
        } else {
            tracing::debug!(kind = %self.kind, error = %self.message, "request rejected");
        }

        let body = ErrorBody {
            error: self.message,
            kind: self.kind.as_str(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handler result type.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lonebox_common::types::ContainerState;

    use super::*;

    #[test]
    fn lifecycle_errors_map_to_statuses() {
        let cases = [
            (
                LoneboxError::InvalidState {
                    operation: "run",
                    state: ContainerState::Absent,
                },
                StatusCode::CONFLICT,
            ),
            (LoneboxError::engine("start", "boom"), StatusCode::BAD_GATEWAY),
            (
                LoneboxError::Timeout {
                    operation: "run",
                    after: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                LoneboxError::Validation {
                    message: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn not_found_names_the_path() {
        let err = ApiError::not_found("/nope");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind().as_str(), "not_found");
    }

    #[test]
    fn wrong_method_is_405() {
        let err = ApiError::method_not_allowed(&Method::GET, "/create");
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.kind().as_str(), "method_not_allowed");
        assert_eq!(err.message, "GET is not allowed on /create");
    }
}
