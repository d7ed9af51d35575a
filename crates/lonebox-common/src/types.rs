//! Domain primitive types used across the Lonebox workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LoneboxError, Result};

/// Engine-assigned identifier for a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated form shown in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(crate::constants::SHORT_ID_LEN)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the managed container.
///
/// Within one lifecycle episode the state only moves forward along
/// `Absent -> Created -> Running -> Stopped -> Removed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// No container has been created yet.
    #[default]
    Absent,
    /// The engine has created the container but it is not started.
    Created,
    /// The container is running and accepts exec requests.
    Running,
    /// The container has been stopped but still exists in the engine.
    Stopped,
    /// The container has been removed from the engine.
    Removed,
}

impl ContainerState {
    /// Returns whether `next` is the immediate successor of this state.
    ///
    /// `Removed -> Created` is accepted as the start of a new episode.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Absent | Self::Removed, Self::Created)
                | (Self::Created, Self::Running)
                | (Self::Running, Self::Stopped)
                | (Self::Stopped, Self::Removed)
        )
    }

    /// Returns whether a new container may be created from this state.
    #[must_use]
    pub const fn is_vacant(self) -> bool {
        matches!(self, Self::Absent | Self::Removed)
    }

    /// Lowercase name used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountSpec {
    /// Absolute path on the engine host.
    pub source: String,
    /// Absolute path inside the container.
    pub target: String,
    /// Whether the mount is read-only.
    #[serde(default)]
    pub read_only: bool,
}

impl MountSpec {
    /// Creates a read-write bind mount.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Checks that both ends of the mount are absolute paths.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending path.
    pub fn validate(&self) -> Result<()> {
        if !is_absolute(&self.source) {
            return Err(LoneboxError::Validation {
                message: format!("mount source must be an absolute path: {:?}", self.source),
            });
        }
        if !self.target.starts_with('/') {
            return Err(LoneboxError::Validation {
                message: format!("mount target must be an absolute path: {:?}", self.target),
            });
        }
        Ok(())
    }

    /// Renders the mount in the engine's `source:target[:ro]` bind syntax.
    #[must_use]
    pub fn to_bind(&self) -> String {
        self.to_string()
    }
}

/// Accepts POSIX paths and drive-letter paths such as `c:/data`.
fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

impl FromStr for MountSpec {
    type Err = LoneboxError;

    /// Parses `source:target[:ro|:rw]`. A drive-letter prefix on the
    /// source (`c:/data:/data`) is kept intact.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LoneboxError::Validation {
            message: format!("mount must look like SOURCE:TARGET[:ro|:rw], got {s:?}"),
        };

        let (rest, read_only) = if let Some(r) = s.strip_suffix(":ro") {
            (r, true)
        } else if let Some(r) = s.strip_suffix(":rw") {
            (r, false)
        } else {
            (s, false)
        };

        let (source, target) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if source.is_empty() || target.is_empty() {
            return Err(invalid());
        }

        let mount = Self {
            source: source.to_string(),
            target: target.to_string(),
            read_only,
        };
        mount.validate()?;
        Ok(mount)
    }
}

/// Immutable configuration captured when a container is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference, e.g. `python:alpine`.
    pub image: String,
    /// Bind mounts applied at creation.
    #[serde(default)]
    pub mounts: Vec<MountSpec>,
    /// Entrypoint arguments; empty keeps the image default.
    #[serde(default)]
    pub command: Vec<String>,
}

impl ContainerSpec {
    /// Creates a spec for `image` with no mounts and the image's own command.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            mounts: Vec::new(),
            command: Vec::new(),
        }
    }

    /// Adds a bind mount.
    #[must_use]
    pub fn mount(mut self, mount: MountSpec) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Rejects an empty image name or malformed mounts.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(LoneboxError::Validation {
                message: "image must not be empty".into(),
            });
        }
        self.mounts.iter().try_for_each(MountSpec::validate)
    }
}

/// Point-in-time view of the managed container slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedContainer {
    /// Engine-assigned id; `None` until the engine has created the container.
    pub id: Option<ContainerId>,
    /// Name given to the container at creation.
    pub name: Option<String>,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Image the container was created from.
    pub image: Option<String>,
    /// Bind mounts applied at creation.
    pub mounts: Vec<MountSpec>,
    /// Entrypoint arguments given at creation.
    pub command: Vec<String>,
    /// Number of lifecycle episodes started by this manager.
    pub episode: u64,
    /// RFC 3339 timestamp of the last successful creation.
    pub created_at: Option<String>,
}

/// Summary of a container as reported by the engine's list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Engine-assigned id.
    pub id: ContainerId,
    /// Image the container runs.
    pub image: String,
    /// Engine-reported state, e.g. `running` or `exited`.
    pub state: String,
    /// Names assigned by the engine.
    pub names: Vec<String>,
}
