//! Queue transports
//!
//! A transport moves opaque payloads between named queues on a shared store.
//! Two operations make up the whole protocol:
//!
//! - **push:** append to the tail of a named queue
//! - **pop_rotate:** block until the queue has an element, then move it from
//!   one end to the other of the *same* queue and return it
//!
//! `pop_rotate` is a non-destructive read: every reader polling a result
//! channel eventually sees the value, and the channel is never cleaned up by
//! the client.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

mod memory;
mod redis_queue;

pub use self::memory::MemoryTransport;
pub use self::redis_queue::RedisTransport;

/// Shared-store queue operations
#[async_trait]
pub trait Transport: Send + Sync {
    /// Append a payload to the tail of `queue`
    async fn push(&self, queue: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Wait for an element on `queue` and rotate it back into the same queue
    ///
    /// `None` (or a zero duration) blocks forever. Returns `Ok(None)` when the
    /// timeout elapses with nothing available.
    async fn pop_rotate(&self, queue: &str, timeout: Option<Duration>) -> Result<Option<Vec<u8>>, TransportError>;

    /// Release any cached connection; a later call connects again
    async fn close(&self) {}
}

/// Normalize a caller timeout: zero means "block forever"
pub(crate) fn effective_timeout(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timeout() {
        assert_eq!(effective_timeout(None), None);
        assert_eq!(effective_timeout(Some(Duration::ZERO)), None);
        assert_eq!(
            effective_timeout(Some(Duration::from_millis(100))),
            Some(Duration::from_millis(100))
        );
    }
}
