//! Router and shared handler state.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use lonebox_common::config::LoneboxConfig;
use lonebox_runtime::manager::LifecycleManager;

use crate::handlers;
use crate::trace::request_id_middleware;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Owner of the managed container.
    pub manager: LifecycleManager,
    /// Defaults applied to requests that omit fields.
    pub config: Arc<LoneboxConfig>,
}

impl AppState {
    /// Bundles the manager with the service configuration.
    #[must_use]
    pub fn new(manager: LifecycleManager, config: LoneboxConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }
}

/// Creates the router with every endpoint.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home).fallback(handlers::method_not_allowed))
        .route(
            "/status",
            get(handlers::status).fallback(handlers::method_not_allowed),
        )
        .route(
            "/create",
            post(handlers::create_container).fallback(handlers::method_not_allowed),
        )
        .route(
            "/run",
            post(handlers::run_command).fallback(handlers::method_not_allowed),
        )
        .route(
            "/remove",
            post(handlers::remove_container).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
