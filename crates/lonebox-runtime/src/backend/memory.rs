//! In-memory engine used by tests and `--dry-run`.
//!
//! Behaves like a well-mannered Docker daemon: containers must be created
//! before they start, exec requires a running container, removal requires a
//! stopped one, and stopping twice is harmless. Every call is counted, and a
//! failure can be armed for the next call of any operation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lonebox_common::error::{LoneboxError, Result};
use lonebox_common::types::{ContainerId, ContainerInfo, ContainerSpec};

use super::ContainerBackend;
use crate::exec::ExecOutput;

/// Engine operations, used to count calls and arm failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `ping`
    Ping,
    /// `create`
    Create,
    /// `start`
    Start,
    /// `exec`
    Exec,
    /// `stop`
    Stop,
    /// `remove`
    Remove,
    /// `list`
    List,
}

const OPERATION_COUNT: usize = 7;

impl Operation {
    const ALL: [Self; OPERATION_COUNT] = [
        Self::Ping,
        Self::Create,
        Self::Start,
        Self::Exec,
        Self::Stop,
        Self::Remove,
        Self::List,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Create => "create",
            Self::Start => "start",
            Self::Exec => "exec",
            Self::Stop => "stop",
            Self::Remove => "remove",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Created,
    Running,
    Exited,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Exited => "exited",
        }
    }
}

#[derive(Debug)]
struct Entry {
    name: Option<String>,
    image: String,
    status: Status,
}

/// Engine that keeps containers in a map.
#[derive(Debug)]
pub struct MemoryBackend {
    containers: Mutex<HashMap<ContainerId, Entry>>,
    armed: Mutex<HashSet<Operation>>,
    calls: [AtomicUsize; OPERATION_COUNT],
    exec_delay: Mutex<Option<Duration>>,
    exec_exit_code: Mutex<i64>,
}

impl MemoryBackend {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            armed: Mutex::new(HashSet::new()),
            calls: std::array::from_fn(|_| AtomicUsize::new(0)),
            exec_delay: Mutex::new(None),
            exec_exit_code: Mutex::new(0),
        }
    }

    /// Makes the next call of `op` fail with an engine error.
    pub fn fail_next(&self, op: Operation) {
        let _ = lock(&self.armed).insert(op);
    }

    /// Delays every exec by `delay` before it produces output.
    pub fn set_exec_delay(&self, delay: Duration) {
        *lock(&self.exec_delay) = Some(delay);
    }

    /// Exit code reported by subsequent execs.
    pub fn set_exec_exit_code(&self, code: i64) {
        *lock(&self.exec_exit_code) = code;
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: Operation) -> usize {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Number of calls made to any operation.
    pub fn total_calls(&self) -> usize {
        Operation::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    /// Number of containers the engine still holds.
    pub fn container_count(&self) -> usize {
        lock(&self.containers).len()
    }

    /// Adds a running container, as if started by another client.
    pub fn seed(&self, id: &str, image: &str) {
        let _ = lock(&self.containers).insert(
            ContainerId::new(id),
            Entry {
                name: None,
                image: image.to_string(),
                status: Status::Running,
            },
        );
    }

    fn enter(&self, op: Operation) -> Result<()> {
        let _ = self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        if lock(&self.armed).remove(&op) {
            return Err(LoneboxError::engine(op.as_str(), "injected failure"));
        }
        Ok(())
    }

    fn with_entry<T>(
        &self,
        op: Operation,
        id: &ContainerId,
        f: impl FnOnce(&mut Entry) -> Result<T>,
    ) -> Result<T> {
        let mut containers = lock(&self.containers);
        let entry = containers
            .get_mut(id)
            .ok_or_else(|| LoneboxError::engine(op.as_str(), format!("no such container: {id}")))?;
        f(entry)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ContainerBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        self.enter(Operation::Ping)
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<ContainerId> {
        self.enter(Operation::Create)?;
        let mut containers = lock(&self.containers);
        if containers.values().any(|e| e.name.as_deref() == Some(name)) {
            return Err(LoneboxError::engine(
                "create",
                format!("name {name:?} is already in use"),
            ));
        }
        let id = ContainerId::new(uuid::Uuid::new_v4().simple().to_string());
        let _ = containers.insert(
            id.clone(),
            Entry {
                name: Some(name.to_string()),
                image: spec.image.clone(),
                status: Status::Created,
            },
        );
        Ok(id)
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        self.enter(Operation::Start)?;
        self.with_entry(Operation::Start, id, |entry| {
            entry.status = Status::Running;
            Ok(())
        })
    }

    async fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput> {
        self.enter(Operation::Exec)?;
        self.with_entry(Operation::Exec, id, |entry| match entry.status {
            Status::Running => Ok(()),
            other => Err(LoneboxError::engine(
                "exec",
                format!("container {id} is {}", other.as_str()),
            )),
        })?;

        let delay = *lock(&self.exec_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(ExecOutput {
            output: format!("{}\n", cmd.join(" ")),
            exit_code: Some(*lock(&self.exec_exit_code)),
        })
    }

    async fn stop(&self, id: &ContainerId) -> Result<()> {
        self.enter(Operation::Stop)?;
        self.with_entry(Operation::Stop, id, |entry| {
            entry.status = Status::Exited;
            Ok(())
        })
    }

    async fn remove(&self, id: &ContainerId) -> Result<()> {
        self.enter(Operation::Remove)?;
        let mut containers = lock(&self.containers);
        match containers.get(id).map(|e| e.status) {
            None => Err(LoneboxError::engine("remove", format!("no such container: {id}"))),
            Some(Status::Running) => Err(LoneboxError::engine(
                "remove",
                format!("container {id} is running, stop it first"),
            )),
            Some(_) => {
                let _ = containers.remove(id);
                Ok(())
            }
        }
    }

    async fn list(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        self.enter(Operation::List)?;
        Ok(lock(&self.containers)
            .iter()
            .filter(|(_, e)| all || e.status == Status::Running)
            .map(|(id, e)| ContainerInfo {
                id: id.clone(),
                image: e.image.clone(),
                state: e.status.as_str().to_string(),
                names: e.name.iter().cloned().collect(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
