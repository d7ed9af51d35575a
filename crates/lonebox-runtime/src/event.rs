//! Lifecycle event streaming.
//!
//! Every committed state transition of the managed container is broadcast
//! as a [`StateChange`], in the order it was applied.

use lonebox_common::types::{ContainerId, ContainerState};
use tokio::sync::broadcast;

/// Capacity of the event channel. Slow subscribers lose the oldest events.
pub const EVENT_CAPACITY: usize = 64;

/// A committed transition of the managed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Container that changed.
    pub container_id: ContainerId,
    /// Previous state.
    pub from: ContainerState,
    /// New state.
    pub to: ContainerState,
    /// Lifecycle episode the transition belongs to.
    pub episode: u64,
}

/// Receiving half handed out by
/// [`LifecycleManager::subscribe`](crate::manager::LifecycleManager::subscribe).
pub type EventReceiver = broadcast::Receiver<StateChange>;

pub(crate) fn channel() -> broadcast::Sender<StateChange> {
    broadcast::channel(EVENT_CAPACITY).0
}
