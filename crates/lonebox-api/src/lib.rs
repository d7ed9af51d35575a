//! # lonebox-api
//!
//! HTTP facade over the [`LifecycleManager`](lonebox_runtime::manager::LifecycleManager).
//!
//! Handlers hold no state of their own: they parse the request, call one
//! manager operation, and turn the typed result into JSON. Error kinds map
//! onto status codes in [`error`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod api;
pub mod error;
pub mod handlers;
pub mod server;
pub mod trace;
pub mod types;
