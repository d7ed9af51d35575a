//! Container engine abstraction.
//!
//! The lifecycle manager only talks to the engine through
//! [`ContainerBackend`]. Implementations are thin: they translate one call
//! into one engine request and report failures as
//! [`LoneboxError::Engine`](lonebox_common::error::LoneboxError::Engine).
//! Deadlines are applied by the caller.

pub mod docker;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use lonebox_common::config::LoneboxConfig;
use lonebox_common::error::Result;
use lonebox_common::types::{ContainerId, ContainerInfo, ContainerSpec};

use crate::exec::ExecOutput;

/// Control API of a container engine.
///
/// Implementations must be safe for concurrent use by several in-flight
/// operations.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Checks that the engine is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not answer.
    async fn ping(&self) -> Result<()>;

    /// Creates a container named `name` from `spec` without starting it.
    ///
    /// The name lets a caller find the container again when the create
    /// acknowledgement never arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the container.
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Starts a previously created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    async fn start(&self, id: &ContainerId) -> Result<()>;

    /// Runs `cmd` inside a running container and collects its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the exec cannot be created, attached, or inspected.
    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput>;

    /// Stops a container. Stopping an already stopped container succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    async fn stop(&self, id: &ContainerId) -> Result<()>;

    /// Removes a stopped or never-started container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    async fn remove(&self, id: &ContainerId) -> Result<()>;

    /// Lists containers known to the engine; `all` includes stopped ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    async fn list(&self, all: bool) -> Result<Vec<ContainerInfo>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Connects to the engine named by the configuration.
///
/// `dry_run` selects the in-memory engine and never touches Docker.
///
/// # Errors
///
/// Returns an error if the Docker endpoint is malformed or unreachable.
pub fn connect(config: &LoneboxConfig, dry_run: bool) -> Result<Arc<dyn ContainerBackend>> {
    if dry_run {
        tracing::info!("using in-memory engine (dry run)");
        return Ok(Arc::new(memory::MemoryBackend::new()));
    }
    let backend = docker::DockerBackend::connect(config)?;
    tracing::info!(host = %config.engine_host, "connected to docker engine");
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_selects_memory_backend() {
        let backend = connect(&LoneboxConfig::default(), true).expect("connect");
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn unsupported_engine_scheme_is_rejected() {
        let config = LoneboxConfig {
            engine_host: "ftp://engine".into(),
            ..LoneboxConfig::default()
        };
        assert!(connect(&config, false).is_err());
    }
}
