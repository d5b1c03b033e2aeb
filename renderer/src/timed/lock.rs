//! Mutual exclusion with bounded acquisition

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time;

/// An asynchronous mutex whose acquisition can be bounded by a deadline.
///
/// Waiters queue on the underlying primitive (wait/notify, no busy-spin) and
/// are woken when the guard drops. Clones share the same underlying lock so
/// a background task can guard the same state as its owner; distinct
/// sessions or supervisors must each construct their own instance.
#[derive(Debug)]
pub struct TimedMutex<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for TimedMutex<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> TimedMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Acquire, waiting as long as it takes.
    pub async fn lock(&self) -> OwnedMutexGuard<T> {
        Arc::clone(&self.inner).lock_owned().await
    }

    /// Acquire within `limit`, or give up and return `None`.
    pub async fn lock_timeout(&self, limit: Duration) -> Option<OwnedMutexGuard<T>> {
        time::timeout(limit, Arc::clone(&self.inner).lock_owned())
            .await
            .ok()
    }
}
