//! System-wide constants and defaults.

/// Application name used in log output.
pub const APP_NAME: &str = "lonebox";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "lonebox";

/// Address the HTTP facade binds to when nothing else is configured.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

/// Docker engine endpoint used when nothing else is configured.
pub const DEFAULT_ENGINE_HOST: &str = "unix:///var/run/docker.sock";

/// Image used for `POST /create` requests that do not name one.
pub const DEFAULT_IMAGE: &str = "python:alpine";

/// Command used for `POST /run` requests that do not supply one.
pub const DEFAULT_COMMAND: &[&str] = &["python", "/test/test.py"];

/// Deadline for a single engine round trip, in seconds.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

/// Deadline for an exec when the caller does not supply one, in seconds.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 60;

/// Upper bound accepted for a caller-supplied exec deadline, in seconds.
pub const MAX_EXEC_TIMEOUT_SECS: u64 = 600;

/// Grace period the engine waits before killing a stopping container, in seconds.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// Number of id characters shown in human-readable listings.
pub const SHORT_ID_LEN: usize = 10;

/// Message returned by `GET /`.
pub const HELLO_MESSAGE: &str = "hello world!";

/// Message returned by a successful `POST /remove`.
pub const REMOVED_MESSAGE: &str = "container removed successfully!";
