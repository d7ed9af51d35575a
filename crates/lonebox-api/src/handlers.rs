//! Request handlers.
//!
//! `POST` bodies are optional: an empty body means "use the configured
//! defaults", anything else must be a JSON object of the matching request
//! type.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{Method, Uri};
use lonebox_common::constants::{HELLO_MESSAGE, REMOVED_MESSAGE};
use lonebox_common::error::LoneboxError;
use lonebox_common::types::{ContainerSpec, ManagedContainer};
use lonebox_runtime::exec;
use serde::de::DeserializeOwned;

use crate::api::AppState;
use crate::error::{ApiError, Result};
use crate::types::{CreateRequest, IdResponse, MessageResponse, RunRequest, RunResponse};

/// Body extractor result; a rejection still renders as a JSON error.
type RawBody = std::result::Result<Bytes, BytesRejection>;

/// Decodes an optional JSON body.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> std::result::Result<T, LoneboxError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| LoneboxError::Validation {
        message: format!("malformed request body: {e}"),
    })
}

/// `GET /`
pub async fn home() -> Json<MessageResponse> {
    Json(MessageResponse::new(HELLO_MESSAGE))
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<ManagedContainer> {
    Json(state.manager.status())
}

/// `POST /create`
///
/// # Errors
///
/// `400` for a malformed body, `413` for an oversized one, `409` if a container is already managed,
/// `502`/`504` if the engine fails or stalls.
pub async fn create_container(
    State(state): State<AppState>,
    body: RawBody,
) -> Result<Json<IdResponse>> {
    let request: CreateRequest = parse_body(&body?)?;
    let spec = ContainerSpec {
        image: request
            .image
            .unwrap_or_else(|| state.config.default_image.clone()),
        mounts: request
            .mounts
            .unwrap_or_else(|| state.config.default_mounts.clone()),
        command: Vec::new(),
    };

    let id = state.manager.create(spec).await?;
    Ok(Json(IdResponse {
        id: id.as_str().to_string(),
    }))
}

/// `POST /run`
///
/// # Errors
///
/// `400` for a malformed body or timeout, `409` unless the container is
/// running, `502` if the exec fails, `504` if it outlives its deadline.
pub async fn run_command(State(state): State<AppState>, body: RawBody) -> Result<Json<RunResponse>> {
    let request: RunRequest = parse_body(&body?)?;
    let timeout = exec::resolve_timeout(
        request.timeout_secs,
        state.config.exec_timeout(),
        state.config.max_exec_timeout(),
    )?;
    let cmd = request
        .cmd
        .unwrap_or_else(|| state.config.default_command.clone());

    let output = state.manager.run_command(cmd, timeout).await?;
    Ok(Json(RunResponse {
        output: output.output,
        exit_code: output.exit_code,
    }))
}

/// `POST /remove`
///
/// # Errors
///
/// `409` unless a container is running or stopped, `502`/`504` if the
/// engine fails or stalls.
pub async fn remove_container(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.manager.remove().await?;
    Ok(Json(MessageResponse::new(REMOVED_MESSAGE)))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

/// Fallback for known routes called with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::method_not_allowed(&method, uri.path())
}
