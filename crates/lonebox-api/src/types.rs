//! Request and response bodies.

use lonebox_common::types::MountSpec;
use serde::{Deserialize, Serialize};

/// Body of `POST /create`. Omitted fields fall back to configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRequest {
    /// Image to create the container from.
    pub image: Option<String>,
    /// Bind mounts for the container.
    pub mounts: Option<Vec<MountSpec>>,
}

/// Body of `POST /run`. Omitted fields fall back to configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRequest {
    /// Command and arguments to execute.
    pub cmd: Option<Vec<String>>,
    /// Deadline for the exec, in seconds.
    pub timeout_secs: Option<u64>,
}

/// `{"message": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Wraps a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{"id": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdResponse {
    /// Engine-assigned container id.
    pub id: String,
}

/// Result of `POST /run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Combined stdout and stderr.
    pub output: String,
    /// Exit code of the command, when the engine reported one.
    pub exit_code: Option<i64>,
}

/// `{"error": ..., "kind": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,
    /// Stable machine-readable classification.
    pub kind: &'static str,
}
