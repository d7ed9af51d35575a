//! `lonebox serve`: Run the lifecycle API.

use anyhow::Context;
use clap::Args;
use lonebox_api::api::AppState;
use lonebox_api::server;
use lonebox_common::config::LoneboxConfig;
use lonebox_common::types::{ContainerState, MountSpec};
use lonebox_runtime::backend;
use lonebox_runtime::manager::LifecycleManager;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "LONEBOX_LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Image used when a create request names none.
    #[arg(long, env = "LONEBOX_IMAGE")]
    pub image: Option<String>,

    /// Default bind mount, `SOURCE:TARGET[:ro|:rw]`. Repeatable.
    #[arg(long = "mount", value_name = "MOUNT")]
    pub mounts: Vec<MountSpec>,

    /// Default exec deadline in seconds.
    #[arg(long, value_name = "SECS")]
    pub exec_timeout: Option<u64>,

    /// Use the in-memory engine instead of Docker.
    #[arg(long)]
    pub dry_run: bool,
}

impl ServeArgs {
    fn apply(self, config: &mut LoneboxConfig) -> bool {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(image) = self.image {
            config.default_image = image;
        }
        if !self.mounts.is_empty() {
            config.default_mounts = self.mounts;
        }
        if let Some(secs) = self.exec_timeout {
            config.exec_timeout_secs = secs;
        }
        self.dry_run
    }
}

/// Executes the `serve` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the engine is
/// unreachable, or the listener cannot be bound.
pub async fn execute(args: ServeArgs, mut config: LoneboxConfig) -> anyhow::Result<()> {
    let dry_run = args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    let addr = config.socket_addr()?;

    let engine = backend::connect(&config, dry_run)?;
    let manager = LifecycleManager::from_config(engine, &config);
    manager
        .ping()
        .await
        .with_context(|| format!("engine at {} is not reachable", config.engine_host))?;
    tracing::info!(backend = manager.backend_name(), "engine reachable");

    match manager.engine_containers(false).await {
        Ok(containers) => {
            tracing::info!(count = containers.len(), "running containers on engine");
            for c in &containers {
                tracing::info!(id = c.id.short(), image = %c.image, "existing container");
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not list existing containers"),
    }

    let listener = server::bind(addr).await?;
    let state = AppState::new(manager.clone(), config);
    server::serve(listener, state, shutdown_signal()).await?;

    let last = manager.status();
    if let (ContainerState::Running, Some(id)) = (last.state, &last.id) {
        tracing::warn!(id = id.short(), "managed container left running");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                let _ = sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = ServeArgs {
            listen: Some("127.0.0.1:8080".into()),
            image: Some("alpine:3".into()),
            mounts: vec![MountSpec::new("/srv/test", "/test")],
            exec_timeout: Some(5),
            dry_run: true,
        };
        let mut config = LoneboxConfig::default();
        assert!(args.apply(&mut config));
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.default_image, "alpine:3");
        assert_eq!(config.default_mounts.len(), 1);
        assert_eq!(config.exec_timeout_secs, 5);
        config.validate().expect("valid");
    }

    #[test]
    fn absent_flags_keep_config() {
        let args = ServeArgs {
            listen: None,
            image: None,
            mounts: Vec::new(),
            exec_timeout: None,
            dry_run: false,
        };
        let mut config = LoneboxConfig::default();
        assert!(!args.apply(&mut config));
        assert_eq!(config, LoneboxConfig::default());
    }
}
