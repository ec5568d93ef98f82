//! In-process transport with the same rotate-on-read semantics as Redis

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use super::{Transport, effective_timeout};
use crate::error::TransportError;

#[derive(Default)]
struct Inner {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    notify: Notify,
}

/// Named queues held in memory
///
/// Cloning shares the same queues, so one clone can play the executor while
/// another backs a client.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destructively pop the head of `queue` without waiting
    ///
    /// This is how an executor consumes its input queue.
    pub fn take(&self, queue: &str) -> Option<Vec<u8>> {
        debug!(%queue, "MemoryTransport::take: called");
        let mut queues = self.lock();
        let value = queues.get_mut(queue)?.pop_front();
        if queues.get(queue).is_some_and(VecDeque::is_empty) {
            queues.remove(queue);
        }
        value
    }

    /// Number of elements currently in `queue`
    pub fn len(&self, queue: &str) -> usize {
        self.lock().get(queue).map_or(0, VecDeque::len)
    }

    /// Names of all non-empty queues
    pub fn queues(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Vec<u8>>>> {
        // Every critical section leaves the queues consistent, so poison is ignored
        self.inner.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_rotate(&self, queue: &str) -> Option<Vec<u8>> {
        let mut queues = self.lock();
        let q = queues.get_mut(queue)?;
        let value = q.pop_front()?;
        q.push_back(value.clone());
        Some(value)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        debug!(%queue, bytes = payload.len(), "MemoryTransport::push: called");
        self.lock().entry(queue.to_string()).or_default().push_back(payload);
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn pop_rotate(&self, queue: &str, timeout: Option<Duration>) -> Result<Option<Vec<u8>>, TransportError> {
        debug!(%queue, ?timeout, "MemoryTransport::pop_rotate: called");
        let deadline = effective_timeout(timeout).map(|t| tokio::time::Instant::now() + t);

        loop {
            // Register interest before checking so a push in between is not missed
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_rotate(queue) {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        debug!(%queue, "MemoryTransport::pop_rotate: timed out");
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }
}
