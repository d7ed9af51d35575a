//! Service configuration model.
//!
//! Values come from an optional JSON file and are then overridden by CLI
//! flags and `LONEBOX_*` environment variables. [`LoneboxConfig::validate`]
//! runs once at startup so a bad image name or mount never reaches the engine.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{LoneboxError, Result};
use crate::types::{ContainerSpec, MountSpec};

/// Root configuration for the Lonebox service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoneboxConfig {
    /// Address the HTTP facade binds to.
    pub listen_addr: String,
    /// Docker engine endpoint (`unix://`, `tcp://` or `http://`).
    pub engine_host: String,
    /// Image used when a create request does not name one.
    pub default_image: String,
    /// Bind mounts used when a create request does not supply any.
    pub default_mounts: Vec<MountSpec>,
    /// Command used when a run request does not supply one.
    pub default_command: Vec<String>,
    /// Deadline for each engine round trip, in seconds.
    pub engine_timeout_secs: u64,
    /// Deadline for an exec when the caller gives none, in seconds.
    pub exec_timeout_secs: u64,
    /// Largest exec deadline a caller may request, in seconds.
    pub max_exec_timeout_secs: u64,
    /// Grace period before the engine kills a stopping container, in seconds.
    pub stop_timeout_secs: u64,
}

impl Default for LoneboxConfig {
    fn default() -> Self {
        Self {
            listen_addr: constants::DEFAULT_LISTEN_ADDR.to_string(),
            engine_host: constants::DEFAULT_ENGINE_HOST.to_string(),
            default_image: constants::DEFAULT_IMAGE.to_string(),
            default_mounts: Vec::new(),
            default_command: constants::DEFAULT_COMMAND
                .iter()
                .map(ToString::to_string)
                .collect(),
            engine_timeout_secs: constants::DEFAULT_ENGINE_TIMEOUT_SECS,
            exec_timeout_secs: constants::DEFAULT_EXEC_TIMEOUT_SECS,
            max_exec_timeout_secs: constants::MAX_EXEC_TIMEOUT_SECS,
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
        }
    }
}

impl LoneboxConfig {
    /// Loads a configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LoneboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Checks every value that would otherwise fail late, at the engine.
    ///
    /// # Errors
    ///
    /// Returns [`LoneboxError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let _ = self.socket_addr()?;

        if self.engine_host.trim().is_empty() {
            return Err(config_error("engine_host must not be empty"));
        }
        if self.default_command.is_empty() {
            return Err(config_error("default_command must not be empty"));
        }
        for (name, value) in [
            ("engine_timeout_secs", self.engine_timeout_secs),
            ("exec_timeout_secs", self.exec_timeout_secs),
            ("max_exec_timeout_secs", self.max_exec_timeout_secs),
            ("stop_timeout_secs", self.stop_timeout_secs),
        ] {
            if value == 0 {
                return Err(config_error(&format!("{name} must be greater than zero")));
            }
        }
        if self.exec_timeout_secs > self.max_exec_timeout_secs {
            return Err(config_error(
                "exec_timeout_secs must not exceed max_exec_timeout_secs",
            ));
        }

        self.default_spec().validate().map_err(|e| match e {
            LoneboxError::Validation { message } => LoneboxError::Config { message },
            other => other,
        })
    }

    /// Parses the listen address.
    ///
    /// # Errors
    ///
    /// Returns [`LoneboxError::Config`] if the address is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| config_error(&format!("listen_addr {:?}: {e}", self.listen_addr)))
    }

    /// Container spec built from the configured defaults.
    #[must_use]
    pub fn default_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.default_image.clone(),
            mounts: self.default_mounts.clone(),
            command: Vec::new(),
        }
    }

    /// Deadline for a single engine round trip.
    #[must_use]
    pub const fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    /// Deadline for an exec with no caller-supplied timeout.
    #[must_use]
    pub const fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Largest exec deadline a caller may request.
    #[must_use]
    pub const fn max_exec_timeout(&self) -> Duration {
        Duration::from_secs(self.max_exec_timeout_secs)
    }
}

fn config_error(message: &str) -> LoneboxError {
    LoneboxError::Config {
        message: message.to_string(),
    }
}
