//! Queue handle shared between user actions and engine callbacks.
//!
//! Engine reports can arrive while the user adds, removes or assigns
//! files. Every access goes through one lock, so each mutation by uuid is
//! applied whole; whichever of a removal and a report takes the lock first
//! decides the outcome.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{FileQueue, ProgressEvent};
use crate::error::QueueResult;

/// Progress callback type handed to the engine collaborator.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cloneable, lock-protected queue.
#[derive(Debug, Clone)]
pub struct SharedFileQueue {
    inner: Arc<Mutex<FileQueue>>,
}

impl SharedFileQueue {
    pub fn new(queue: FileQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    /// Run a mutation under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut FileQueue) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    /// Run a read under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&FileQueue) -> R) -> R {
        let guard = self.inner.lock();
        f(&*guard)
    }

    /// Apply one engine event atomically.
    pub fn apply_event(&self, event: ProgressEvent) -> QueueResult<()> {
        self.inner.lock().apply_event(event)
    }

    /// Callback for the engine. Rejected events are logged, not returned,
    /// since the engine has no use for them.
    pub fn progress_callback(&self) -> ProgressCallback {
        let queue = self.clone();
        Box::new(move |event| {
            let uuid = event.uuid().to_string();
            if let Err(e) = queue.apply_event(event) {
                tracing::warn!("Engine report for {} not applied: {}", uuid, e);
            }
        })
    }
}
