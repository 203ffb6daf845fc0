//! In-flight call bookkeeping.
//!
//! Each dispatched call registers itself and receives a cancellation
//! receiver. Cancelling sends on the matching sender and removes the entry;
//! completion removes it too. All mutations go through one mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Unique identifier for an in-flight call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// The numeric value of the identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Snapshot of a registered call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    /// The call identifier.
    pub id: TaskId,
    /// The URL being requested.
    pub url: String,
    /// How long the call has been registered.
    pub age: Duration,
}

struct TaskEntry {
    url: String,
    started_at: Instant,
    cancel_tx: oneshot::Sender<()>,
}

/// Registry of in-flight calls, keyed by [`TaskId`].
#[derive(Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call and return its id with the receiver that fires on cancel.
    ///
    /// The receiver also resolves if the entry is dropped without an explicit
    /// cancel; callers treat both the same way.
    pub fn register(&self, url: impl Into<String>) -> (TaskId, oneshot::Receiver<()>) {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.tasks.lock().insert(
            id,
            TaskEntry {
                url: url.into(),
                started_at: Instant::now(),
                cancel_tx,
            },
        );
        (id, cancel_rx)
    }

    /// Remove a finished call. Returns `false` if it was already removed.
    pub fn complete(&self, id: TaskId) -> bool {
        self.tasks.lock().remove(&id).is_some()
    }

    /// Cancel one call and remove it. Returns `false` for an unknown id.
    pub fn cancel(&self, id: TaskId) -> bool {
        let entry = self.tasks.lock().remove(&id);
        match entry {
            Some(entry) => {
                // The call may have just finished and dropped its receiver.
                let _ = entry.cancel_tx.send(());
                true
            }
            None => false,
        }
    }

    /// Cancel every registered call. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<TaskEntry> = self.tasks.lock().drain().map(|(_, entry)| entry).collect();
        let count = drained.len();
        for entry in drained {
            let _ = entry.cancel_tx.send(());
        }
        count
    }

    /// Whether a call is still registered.
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.lock().contains_key(&id)
    }

    /// Number of registered calls.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether no call is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all registered calls, ordered by id.
    pub fn snapshot(&self) -> Vec<TaskInfo> {
        let now = Instant::now();
        let mut infos: Vec<TaskInfo> = self
            .tasks
            .lock()
            .iter()
            .map(|(id, entry)| TaskInfo {
                id: *id,
                url: entry.url.clone(),
                age: now.duration_since(entry.started_at),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("active", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let registry = TaskRegistry::new();
        let (a, _rx_a) = registry.register("https://example.com/a");
        let (b, _rx_b) = registry.register("https://example.com/b");
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_fires_receiver_and_removes_entry() {
        let registry = TaskRegistry::new();
        let (id, rx) = registry.register("https://example.com");
        assert!(registry.cancel(id));
        assert!(!registry.contains(id));
        assert!(rx.await.is_ok());
        assert!(!registry.cancel(id));
    }

    #[test]
    fn test_complete_is_idempotent() {
        let registry = TaskRegistry::new();
        let (id, _rx) = registry.register("https://example.com");
        assert!(registry.complete(id));
        assert!(!registry.complete(id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_all_empties_registry() {
        let registry = TaskRegistry::new();
        let receivers: Vec<_> = (0..3)
            .map(|i| registry.register(format!("https://example.com/{i}")).1)
            .collect();
        assert_eq!(registry.cancel_all(), 3);
        assert!(registry.is_empty());
        for rx in receivers {
            assert!(rx.await.is_ok());
        }
    }

    #[test]
    fn test_snapshot_lists_urls() {
        let registry = TaskRegistry::new();
        let (id, _rx) = registry.register("https://example.com/x");
        let infos = registry.snapshot();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].id, id);
        assert_eq!(infos[0].url, "https://example.com/x");
    }
}
