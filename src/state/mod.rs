//! Application-wide event notifications.
//!
//! The [`EventBus`] is constructed once per service instance and handed to
//! the manager and each task by clone; its lifetime is scoped to the owning
//! service, not a module-level singleton.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::transcode::TaskId;

/// Default broadcast channel capacity.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications emitted by the transcode manager and its tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TranscoderEvent {
    /// A task passed admission and entered the registry.
    TaskAdded { task_id: TaskId },
    /// A task was removed from the registry.
    TaskRemoved { task_id: TaskId },
    /// A task's segmenter process terminated, whether by request or on its own.
    TaskTerminated { task_id: TaskId },
    /// The service is draining all active tasks.
    ShutdownRequested,
    /// All active tasks have been drained.
    ShutdownComplete,
}

/// Broadcast channel carrying [`TranscoderEvent`]s between components.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TranscoderEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event to all current subscribers.
    pub fn emit(&self, event: TranscoderEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("no subscribers for transcoder event");
        }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TranscoderEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
