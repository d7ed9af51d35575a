//! Lifecycle manager for the single managed container.
//!
//! The manager owns the only [`ManagedContainer`] record. Mutating
//! operations (`create`, `run_command`, `remove`) take a FIFO async mutex
//! and hold it across their engine round trips, so they observe a total
//! order. Readers go through [`LifecycleManager::status`], which copies a
//! snapshot published after every committed transition and never waits on
//! that mutex.
//!
//! `create` and `remove` run on a spawned task: if the caller goes away
//! mid-operation the transition still completes and the record stays in
//! step with the engine. `run_command` does not; dropping it abandons the
//! exec on our side, while the engine may keep running it.
//!
//! Each create attempt names its container `lonebox-<instance>-<attempt>`.
//! When a create or start goes unacknowledged, the container is found again
//! by that name, then stopped and removed. The engine holds no container
//! of ours that the slot does not track.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lonebox_common::config::LoneboxConfig;
use lonebox_common::constants::APP_NAME;
use lonebox_common::error::{LoneboxError, Result};
use lonebox_common::types::{
    ContainerId, ContainerInfo, ContainerSpec, ContainerState, ManagedContainer,
};
use tokio::sync::{Mutex, broadcast, watch};

use crate::backend::ContainerBackend;
use crate::event::{self, EventReceiver, StateChange};
use crate::exec::{self, ExecOutput};

/// Serialized owner of the managed container.
///
/// Cloning is cheap and every clone drives the same container.
#[derive(Clone)]
pub struct LifecycleManager {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn ContainerBackend>,
    engine_timeout: Duration,
    instance: String,
    attempts: AtomicU64,
    record: Mutex<ManagedContainer>,
    snapshot: watch::Sender<ManagedContainer>,
    events: broadcast::Sender<StateChange>,
}

impl LifecycleManager {
    /// Creates a manager with an empty slot.
    ///
    /// `engine_timeout` bounds every engine round trip made by `create`
    /// and `remove`.
    #[must_use]
    pub fn new(backend: Arc<dyn ContainerBackend>, engine_timeout: Duration) -> Self {
        let initial = ManagedContainer::default();
        Self {
            inner: Arc::new(Inner {
                backend,
                engine_timeout,
                instance: instance_tag(),
                attempts: AtomicU64::new(0),
                record: Mutex::new(initial.clone()),
                snapshot: watch::Sender::new(initial),
                events: event::channel(),
            }),
        }
    }

    /// Creates a manager using the configured engine timeout.
    #[must_use]
    pub fn from_config(backend: Arc<dyn ContainerBackend>, config: &LoneboxConfig) -> Self {
        Self::new(backend, config.engine_timeout())
    }

    /// Creates and starts a container from `spec`.
    ///
    /// Only legal while the slot is `Absent` or `Removed`. On any engine
    /// failure the slot keeps its previous state; a container the engine
    /// may have created is stopped and removed again on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`LoneboxError::Validation`] for a bad spec,
    /// [`LoneboxError::InvalidState`] if a container is already managed,
    /// [`LoneboxError::Engine`] or [`LoneboxError::Timeout`] if the engine
    /// fails.
    pub async fn create(&self, spec: ContainerSpec) -> Result<ContainerId> {
        spec.validate()?;
        let inner = Arc::clone(&self.inner);
        detach("create", async move { inner.create(spec).await }).await
    }

    /// Runs `cmd` in the managed container and returns its combined output.
    ///
    /// The whole operation, including the wait for exclusive access, is
    /// bounded by `timeout`. A timed-out exec leaves the managed state
    /// untouched, but the engine may still be running the command.
    ///
    /// # Errors
    ///
    /// Returns [`LoneboxError::InvalidState`] unless the container is
    /// `Running` (no engine call is made in that case),
    /// [`LoneboxError::Timeout`] when `timeout` elapses, and
    /// [`LoneboxError::Engine`] if the exec fails.
    pub async fn run_command(&self, cmd: Vec<String>, timeout: Duration) -> Result<ExecOutput> {
        exec::validate_command(&cmd)?;
        tokio::time::timeout(timeout, self.inner.run_command(&cmd))
            .await
            .map_err(|_| {
                tracing::warn!(
                    cmd = ?cmd,
                    timeout_secs = timeout.as_secs(),
                    "exec timed out, engine may still be running it"
                );
                LoneboxError::Timeout {
                    operation: "run",
                    after: timeout,
                }
            })?
    }

    /// Stops and removes the managed container.
    ///
    /// Legal while `Running` or `Stopped`. Stopping an already stopped
    /// container is not an error. If the stop succeeds but the removal fails
    /// the slot is left `Stopped`, so the call can simply be retried.
    ///
    /// # Errors
    ///
    /// Returns [`LoneboxError::InvalidState`] from any other state, and
    /// [`LoneboxError::Engine`] or [`LoneboxError::Timeout`] if the engine
    /// fails.
    pub async fn remove(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        detach("remove", async move { inner.remove().await }).await
    }

    /// Returns a copy of the managed container record.
    #[must_use]
    pub fn status(&self) -> ManagedContainer {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribes to committed state transitions.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// Lists containers known to the engine, managed or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried in time.
    pub async fn engine_containers(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        self.inner
            .call("list", self.inner.backend.list(all))
            .await
    }

    /// Checks that the engine answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine does not answer in time.
    pub async fn ping(&self) -> Result<()> {
        self.inner.call("ping", self.inner.backend.ping()).await
    }

    /// Name of the engine backend in use.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("backend", &self.inner.backend.name())
            .field("status", &self.status())
            .finish()
    }
}

/// Short random tag that keeps container names unique across restarts.
fn instance_tag() -> String {
    let mut tag = uuid::Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}

/// Runs `fut` on its own task so a dropped caller cannot interrupt it.
async fn detach<T, F>(operation: &'static str, fut: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| LoneboxError::engine(operation, format!("task failed: {e}")))?
}

impl Inner {
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.engine_timeout, fut)
            .await
            .map_err(|_| LoneboxError::Timeout {
                operation,
                after: self.engine_timeout,
            })?
    }

    async fn create(&self, spec: ContainerSpec) -> Result<ContainerId> {
        let mut record = self.record.lock().await;
        if !record.state.is_vacant() {
            return Err(LoneboxError::InvalidState {
                operation: "create",
                state: record.state,
            });
        }

        let episode = record.episode + 1;
        let name = self.next_container_name();
        let id = match self.call("create", self.backend.create(&name, &spec)).await {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, LoneboxError::Timeout { .. }) {
                    self.discard_named(&name).await;
                }
                return Err(e);
            }
        };
        tracing::debug!(id = %id, %name, image = %spec.image, "container created, starting");

        if let Err(e) = self.call("start", self.backend.start(&id)).await {
            tracing::warn!(id = %id, error = %e, "start failed, discarding container");
            self.discard(&id).await;
            return Err(e);
        }

        // The new episode becomes visible only once the engine has both
        // created and started the container.
        *record = ManagedContainer {
            id: Some(id.clone()),
            name: Some(name),
            state: record.state,
            image: Some(spec.image),
            mounts: spec.mounts,
            command: spec.command,
            episode,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.advance(&mut record, ContainerState::Created)?;
        self.advance(&mut record, ContainerState::Running)?;
        Ok(id)
    }

    fn next_container_name(&self) -> String {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{APP_NAME}-{}-{attempt}", self.instance)
    }

    /// Stops and removes a container the slot will not track.
    async fn discard(&self, id: &ContainerId) {
        if let Err(e) = self.call("stop", self.backend.stop(id)).await {
            tracing::warn!(id = %id, error = %e, "could not stop discarded container");
        }
        if let Err(e) = self.call("remove", self.backend.remove(id)).await {
            tracing::warn!(id = %id, error = %e, "could not remove discarded container");
        }
    }

    /// Discards the container created under `name`, if the engine has one.
    async fn discard_named(&self, name: &str) {
        match self.call("list", self.backend.list(true)).await {
            Ok(containers) => {
                let found = containers
                    .into_iter()
                    .filter(|c| c.names.iter().any(|n| n == name));
                for container in found {
                    tracing::warn!(id = %container.id, %name, "discarding unacknowledged container");
                    self.discard(&container.id).await;
                }
            }
            Err(e) => tracing::warn!(%name, error = %e, "could not look up unacknowledged container"),
        }
    }

    async fn run_command(&self, cmd: &[String]) -> Result<ExecOutput> {
        let record = self.record.lock().await;
        let id = match (&record.id, record.state) {
            (Some(id), ContainerState::Running) => id.clone(),
            (_, state) => {
                return Err(LoneboxError::InvalidState {
                    operation: "run",
                    state,
                });
            }
        };

        tracing::info!(id = %id, cmd = ?cmd, "running command");
        let output = self.backend.exec(&id, cmd).await?;
        tracing::info!(id = %id, exit_code = ?output.exit_code, bytes = output.output.len(), "command finished");
        drop(record);
        Ok(output)
    }

    async fn remove(&self) -> Result<()> {
        let mut record = self.record.lock().await;
        let id = match (&record.id, record.state) {
            (Some(id), ContainerState::Running | ContainerState::Stopped) => id.clone(),
            (_, state) => {
                return Err(LoneboxError::InvalidState {
                    operation: "remove",
                    state,
                });
            }
        };

        self.call("stop", self.backend.stop(&id)).await?;
        if record.state == ContainerState::Running {
            self.advance(&mut record, ContainerState::Stopped)?;
        }

        self.call("remove", self.backend.remove(&id)).await?;
        self.advance(&mut record, ContainerState::Removed)
    }

    /// Commits a transition, publishing the snapshot and the event.
    fn advance(&self, record: &mut ManagedContainer, next: ContainerState) -> Result<()> {
        let from = record.state;
        if !from.can_advance_to(next) {
            return Err(LoneboxError::InvalidState {
                operation: "transition",
                state: from,
            });
        }
        record.state = next;

        let _ = self.snapshot.send_replace(record.clone());
        if let Some(id) = &record.id {
            tracing::info!(id = %id, from = %from, to = %next, episode = record.episode, "container state changed");
            let _ = self.events.send(StateChange {
                container_id: id.clone(),
                from,
                to: next,
                episode: record.episode,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, Operation};

    fn manager() -> (LifecycleManager, Arc<MemoryBackend>) {
        let engine = Arc::new(MemoryBackend::new());
        let backend: Arc<dyn ContainerBackend> = engine.clone();
        (LifecycleManager::new(backend, Duration::from_secs(5)), engine)
    }

    fn spec() -> ContainerSpec {
        ContainerSpec::new("python:alpine")
    }

    #[tokio::test]
    async fn new_manager_is_absent() {
        let (manager, engine) = manager();
        let status = manager.status();
        assert_eq!(status.state, ContainerState::Absent);
        assert!(status.id.is_none());
        assert_eq!(status.episode, 0);
        assert_eq!(engine.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_records_id_and_runs() {
        let (manager, engine) = manager();
        let id = manager.create(spec()).await.expect("create");

        let status = manager.status();
        assert_eq!(status.state, ContainerState::Running);
        assert_eq!(status.id.as_ref(), Some(&id));
        assert_eq!(status.image.as_deref(), Some("python:alpine"));
        assert_eq!(status.episode, 1);
        assert!(status.created_at.is_some());
        assert_eq!(engine.calls(Operation::Create), 1);
        assert_eq!(engine.calls(Operation::Start), 1);
    }

    #[tokio::test]
    async fn invalid_spec_never_reaches_engine() {
        let (manager, engine) = manager();
        let err = manager.create(ContainerSpec::new("")).await.unwrap_err();
        assert!(matches!(err, LoneboxError::Validation { .. }));
        assert_eq!(engine.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_failure_leaves_slot_absent() {
        let (manager, engine) = manager();
        engine.fail_next(Operation::Create);

        let err = manager.create(spec()).await.unwrap_err();
        assert!(matches!(err, LoneboxError::Engine { operation: "create", .. }));
        assert_eq!(manager.status().state, ContainerState::Absent);
        assert!(manager.status().id.is_none());
    }

    #[tokio::test]
    async fn start_failure_discards_created_container() {
        let (manager, engine) = manager();
        engine.fail_next(Operation::Start);

        let err = manager.create(spec()).await.unwrap_err();
        assert!(matches!(err, LoneboxError::Engine { operation: "start", .. }));
        assert_eq!(manager.status().state, ContainerState::Absent);
        assert_eq!(engine.calls(Operation::Stop), 1);
        assert_eq!(engine.calls(Operation::Remove), 1);
        assert_eq!(engine.container_count(), 0);
    }

    #[tokio::test]
    async fn run_returns_output_and_exit_code() {
        let (manager, engine) = manager();
        let _ = manager.create(spec()).await.unwrap();
        engine.set_exec_exit_code(3);

        let out = manager
            .run_command(
                vec!["python".into(), "/test/test.py".into()],
                Duration::from_secs(1),
            )
            .await
            .expect("run");
        assert_eq!(out.output, "python /test/test.py\n");
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(manager.status().state, ContainerState::Running);
    }

    #[tokio::test]
    async fn run_engine_failure_keeps_running() {
        let (manager, engine) = manager();
        let _ = manager.create(spec()).await.unwrap();
        engine.fail_next(Operation::Exec);

        let err = manager
            .run_command(vec!["true".into()], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LoneboxError::Engine { .. }));
        assert_eq!(manager.status().state, ContainerState::Running);
    }

    #[tokio::test]
    async fn remove_stops_then_removes() {
        let (manager, engine) = manager();
        let _ = manager.create(spec()).await.unwrap();

        manager.remove().await.expect("remove");
        assert_eq!(manager.status().state, ContainerState::Removed);
        assert_eq!(engine.calls(Operation::Stop), 1);
        assert_eq!(engine.calls(Operation::Remove), 1);
        assert_eq!(engine.container_count(), 0);
    }

    #[tokio::test]
    async fn remove_without_container_is_invalid_state() {
        let (manager, engine) = manager();
        let err = manager.remove().await.unwrap_err();
        assert!(matches!(
            err,
            LoneboxError::InvalidState {
                state: ContainerState::Absent,
                ..
            }
        ));
        assert_eq!(engine.total_calls(), 0);
    }

    #[tokio::test]
    async fn stop_failure_keeps_running() {
        let (manager, engine) = manager();
        let _ = manager.create(spec()).await.unwrap();
        engine.fail_next(Operation::Stop);

        assert!(manager.remove().await.is_err());
        assert_eq!(manager.status().state, ContainerState::Running);
        assert_eq!(engine.calls(Operation::Remove), 0);
    }

    #[tokio::test]
    async fn new_episode_after_remove_gets_new_id() {
        let (manager, _engine) = manager();
        let first = manager.create(spec()).await.unwrap();
        manager.remove().await.unwrap();
        let second = manager.create(spec()).await.unwrap();

        assert_ne!(first, second);
        let status = manager.status();
        assert_eq!(status.episode, 2);
        assert_eq!(status.id, Some(second));
    }

    #[tokio::test]
    async fn engine_containers_passes_through() {
        let (manager, engine) = manager();
        engine.seed("0123456789abcdef", "python:alpine");
        let listed = manager.engine_containers(false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.short(), "0123456789");
        manager.ping().await.expect("ping");
        assert_eq!(manager.backend_name(), "memory");
    }
}
