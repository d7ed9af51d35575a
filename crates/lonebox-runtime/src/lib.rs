//! Lifecycle management for the single container Lonebox drives.
//!
//! The [`manager::LifecycleManager`] owns the managed container record and
//! serializes every mutation against it. Engine access goes through the
//! [`backend::ContainerBackend`] trait, implemented for Docker and for an
//! in-memory engine used by tests and dry runs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod event;
pub mod exec;
pub mod manager;
