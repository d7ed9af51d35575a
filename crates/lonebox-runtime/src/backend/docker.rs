//! Docker engine backend built on `bollard`.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::HostConfig;
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::StreamExt;
use lonebox_common::config::LoneboxConfig;
use lonebox_common::error::{LoneboxError, Result};
use lonebox_common::types::{ContainerId, ContainerInfo, ContainerSpec, MountSpec};

use super::ContainerBackend;
use crate::exec::ExecOutput;

/// Status the engine returns when stopping a container that is not running.
const NOT_MODIFIED: u16 = 304;

/// Backend that drives a Docker-compatible engine over its HTTP API.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    docker: Docker,
    stop_timeout_secs: i64,
}

impl DockerBackend {
    /// Builds a client for the configured `engine_host`.
    ///
    /// Accepts `unix://` socket paths and `tcp://` or `http://` endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error for any other scheme or if the client cannot be built.
    pub fn connect(config: &LoneboxConfig) -> Result<Self> {
        let host = config.engine_host.as_str();
        let timeout = config.engine_timeout_secs;

        let docker = if let Some(path) = host.strip_prefix("unix://") {
            Docker::connect_with_socket(path, timeout, API_DEFAULT_VERSION)
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, timeout, API_DEFAULT_VERSION)
        } else {
            return Err(LoneboxError::Config {
                message: format!("unsupported engine_host {host:?}"),
            });
        }
        .map_err(|e| LoneboxError::engine("connect", e))?;

        Ok(Self {
            docker,
            stop_timeout_secs: i64::try_from(config.stop_timeout_secs).unwrap_or(i64::MAX),
        })
    }
}

/// Whether a stop failed only because the container was not running.
fn is_already_stopped(err: &DockerError) -> bool {
    matches!(
        err,
        DockerError::DockerResponseServerError {
            status_code: NOT_MODIFIED,
            ..
        }
    )
}

#[async_trait]
impl ContainerBackend for DockerBackend {
    async fn ping(&self) -> Result<()> {
        let _ = self
            .docker
            .ping()
            .await
            .map_err(|e| LoneboxError::engine("ping", e))?;
        Ok(())
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<ContainerId> {
        let binds: Vec<String> = spec.mounts.iter().map(MountSpec::to_bind).collect();
        let config = Config {
            image: Some(spec.image.clone()),
            cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
            // Keeps interpreter images like python:alpine alive between execs.
            open_stdin: Some(true),
            host_config: Some(HostConfig {
                binds: (!binds.is_empty()).then_some(binds),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.to_string(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(|e| LoneboxError::engine("create", e))?;
        for warning in &response.warnings {
            tracing::warn!(id = %response.id, %warning, "engine warning on create");
        }
        tracing::debug!(id = %response.id, %name, image = %spec.image, "docker container created");
        Ok(ContainerId::new(response.id))
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| LoneboxError::engine("start", e))
    }

    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput> {
        let exec = self
            .docker
            .create_exec(
                id.as_str(),
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    cmd: Some(cmd.to_vec()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| LoneboxError::engine("exec create", e))?;

        let mut buffer = Vec::new();
        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| LoneboxError::engine("exec attach", e))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    let chunk = chunk.map_err(|e| LoneboxError::engine("exec attach", e))?;
                    buffer.extend_from_slice(&chunk.into_bytes());
                }
            }
            StartExecResults::Detached => {
                tracing::warn!(exec_id = %exec.id, "exec started detached, no output captured");
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| LoneboxError::engine("exec inspect", e))?;

        Ok(ExecOutput {
            output: String::from_utf8_lossy(&buffer).into_owned(),
            exit_code: inspect.exit_code,
        })
    }

    async fn stop(&self, id: &ContainerId) -> Result<()> {
        let options = StopContainerOptions {
            t: self.stop_timeout_secs,
        };
        match self.docker.stop_container(id.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_already_stopped(&e) => {
                tracing::debug!(id = %id, "container already stopped");
                Ok(())
            }
            Err(e) => Err(LoneboxError::engine("stop", e)),
        }
    }

    async fn remove(&self, id: &ContainerId) -> Result<()> {
        self.docker
            .remove_container(id.as_str(), Some(RemoveContainerOptions::default()))
            .await
            .map_err(|e| LoneboxError::engine("remove", e))
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| LoneboxError::engine("list", e))?;

        Ok(summaries
            .into_iter()
            .map(|s| ContainerInfo {
                id: ContainerId::new(s.id.unwrap_or_default()),
                image: s.image.unwrap_or_default(),
                state: s.state.unwrap_or_default(),
                names: s
                    .names
                    .unwrap_or_default()
                    .into_iter()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .collect(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_accepts_unix_socket() {
        let backend = DockerBackend::connect(&LoneboxConfig::default()).expect("client");
        assert_eq!(backend.name(), "docker");
        assert_eq!(backend.stop_timeout_secs, 10);
    }

    #[test]
    fn connect_accepts_tcp_endpoint() {
        let config = LoneboxConfig {
            engine_host: "tcp://127.0.0.1:2375".into(),
            ..LoneboxConfig::default()
        };
        assert!(DockerBackend::connect(&config).is_ok());
    }

    #[test]
    fn not_modified_means_already_stopped() {
        let not_modified = DockerError::DockerResponseServerError {
            status_code: 304,
            message: String::new(),
        };
        assert!(is_already_stopped(&not_modified));

        let missing = DockerError::DockerResponseServerError {
            status_code: 404,
            message: "No such container".into(),
        };
        assert!(!is_already_stopped(&missing));
    }

    #[test]
    fn connect_rejects_unknown_scheme() {
        let config = LoneboxConfig {
            engine_host: "npipe:////./pipe/docker_engine".into(),
            ..LoneboxConfig::default()
        };
        let err = DockerBackend::connect(&config).unwrap_err();
        assert!(matches!(err, LoneboxError::Config { .. }));
    }
}
