use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::RwLock;
use uuid::Uuid;

use hopper_queue::{Item, Put, Queue, SubscriberId, Wait, Waiter};

/// Textual length of a queue id: 8-4-4-4-12 hyphenated hex.
pub const QUEUE_ID_STR_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueLookupError {
    /// The supplied name is not a well-formed 36-character id.
    #[error("invalid queue id")]
    InvalidId,
    /// The id is well-formed but no queue carries it.
    #[error("queue does not exist")]
    NotFound,
}

// ── Registry ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RegistryInner {
    /// All queues, in creation order; listings preserve this order.
    queues: Vec<Queue>,
    /// Every live waiter across all queues, so a disconnect or shutdown is
    /// a single pass. Queues own the strong references; entries here expire
    /// on their own once a waiter is delivered or its queue is torn down.
    waiters: Vec<Weak<Waiter>>,
}

impl RegistryInner {
    fn queue_mut(&mut self, id: Uuid) -> Option<&mut Queue> {
        self.queues.iter_mut().find(|q| q.id() == id)
    }

    fn prune_waiters(&mut self) {
        self.waiters.retain(|w| w.strong_count() > 0);
    }
}

/// Process-wide directory of queues and waiters.
///
/// One write lock serializes every mutation, which is what upholds the
/// engine's ordering and at-most-one-delivery invariants; handlers never
/// hold it across I/O. Constructed once and shared by all endpoints.
pub struct Registry {
    inner: RwLock<RegistryInner>,
    next_subscriber: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            next_subscriber: AtomicU64::new(1),
        }
    }

    /// Allocate a handle for a newly-connected WebSocket client.
    pub fn next_subscriber_id(&self) -> SubscriberId {
        SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed))
    }

    /// Parse a client-supplied queue id. Exactly 36 hyphenated hex
    /// characters; parsing normalizes case, so lookups by the resulting
    /// value are case-insensitive.
    fn parse_id(name: &str) -> Result<Uuid, QueueLookupError> {
        if name.len() != QUEUE_ID_STR_LEN {
            return Err(QueueLookupError::InvalidId);
        }
        Uuid::try_parse(name).map_err(|_| QueueLookupError::InvalidId)
    }

    /// Create a queue (random id when `name` is absent) and return its
    /// textual id. A name that already exists returns the existing queue.
    pub async fn create(&self, name: Option<&str>) -> Result<String, QueueLookupError> {
        let mut inner = self.inner.write().await;

        let id = match name {
            None => None,
            Some(name) => {
                let id = Self::parse_id(name)?;
                if inner.queues.iter().any(|q| q.id() == id) {
                    return Ok(id.to_string());
                }
                Some(id)
            }
        };

        let queue = Queue::new(id);
        let id = queue.id();
        inner.queues.push(queue);
        tracing::debug!(queue = %id, "queue created");
        Ok(id.to_string())
    }

    /// Look up an existing queue, returning its canonical textual id.
    pub async fn find(&self, name: &str) -> Result<String, QueueLookupError> {
        let id = Self::parse_id(name)?;
        let inner = self.inner.read().await;
        inner
            .queues
            .iter()
            .find(|q| q.id() == id)
            .map(|q| q.id().to_string())
            .ok_or(QueueLookupError::NotFound)
    }

    /// Delete a queue: cancel its waiters (their deliveries never fire)
    /// and drop its buffered items.
    pub async fn delete(&self, name: &str) -> Result<(), QueueLookupError> {
        let id = Self::parse_id(name)?;
        let mut inner = self.inner.write().await;
        let pos = inner
            .queues
            .iter()
            .position(|q| q.id() == id)
            .ok_or(QueueLookupError::NotFound)?;

        let mut queue = inner.queues.remove(pos);
        queue.cancel_waiters();
        inner.prune_waiters();
        tracing::debug!(queue = %id, "queue deleted");
        Ok(())
    }

    /// All queue ids, in creation order.
    pub async fn list(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.queues.iter().map(|q| q.id().to_string()).collect()
    }

    pub async fn put(
        &self,
        name: &str,
        key: Option<String>,
        value: String,
    ) -> Result<Put, QueueLookupError> {
        let id = Self::parse_id(name)?;
        let mut inner = self.inner.write().await;
        let queue = inner.queue_mut(id).ok_or(QueueLookupError::NotFound)?;
        Ok(queue.put(key, value))
    }

    pub async fn take(
        &self,
        name: &str,
        filter: Option<&str>,
    ) -> Result<Option<Arc<Item>>, QueueLookupError> {
        let id = Self::parse_id(name)?;
        let mut inner = self.inner.write().await;
        let queue = inner.queue_mut(id).ok_or(QueueLookupError::NotFound)?;
        Ok(queue.take(filter))
    }

    pub async fn peek(
        &self,
        name: &str,
        filter: Option<&str>,
    ) -> Result<Option<Arc<Item>>, QueueLookupError> {
        let id = Self::parse_id(name)?;
        let inner = self.inner.read().await;
        let queue = inner
            .queues
            .iter()
            .find(|q| q.id() == id)
            .ok_or(QueueLookupError::NotFound)?;
        Ok(queue.peek(filter))
    }

    /// Subscribe a waiter, delivering immediately when an item already
    /// matches. Queued waiters are tracked for cancellation passes.
    pub async fn wait(&self, name: &str, waiter: Waiter) -> Result<Wait, QueueLookupError> {
        let id = Self::parse_id(name)?;
        let mut inner = self.inner.write().await;

        let outcome = {
            let queue = inner.queue_mut(id).ok_or(QueueLookupError::NotFound)?;
            queue.wait(waiter)
        };
        if let Wait::Queued(waiter) = &outcome {
            inner.waiters.push(Arc::downgrade(waiter));
        }
        Ok(outcome)
    }

    /// Latch-cancel every waiter registered by a disconnected client. The
    /// records survive inside their queues until a put scan purges them;
    /// they will never receive a delivery.
    pub async fn cancel_for_subscriber(&self, subscriber: SubscriberId) {
        let mut inner = self.inner.write().await;
        let mut cancelled = 0usize;
        inner.waiters.retain(|weak| {
            let Some(waiter) = weak.upgrade() else {
                return false;
            };
            if waiter.subscriber() == subscriber {
                waiter.cancel();
                cancelled += 1;
                return false;
            }
            true
        });
        if cancelled > 0 {
            tracing::debug!(%subscriber, cancelled, "cancelled waiters for closed connection");
        }
    }

    /// Cancel everything and drop all queues. Used at process shutdown.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        for weak in inner.waiters.drain(..) {
            if let Some(waiter) = weak.upgrade() {
                waiter.cancel();
            }
        }
        for mut queue in inner.queues.drain(..) {
            queue.cancel_waiters();
        }
        tracing::debug!("registry shut down");
    }

    /// Number of live waiters tracked across all queues.
    pub async fn waiter_total(&self) -> usize {
        let mut inner = self.inner.write().await;
        inner.prune_waiters();
        inner.waiters.len()
    }

    /// (item, keyed item, waiter, keyed waiter) counts for one queue.
    pub async fn queue_stats(
        &self,
        name: &str,
    ) -> Result<(usize, usize, usize, usize), QueueLookupError> {
        let id = Self::parse_id(name)?;
        let inner = self.inner.read().await;
        let queue = inner
            .queues
            .iter()
            .find(|q| q.id() == id)
            .ok_or(QueueLookupError::NotFound)?;
        Ok((
            queue.item_count(),
            queue.keyed_item_count(),
            queue.waiter_count(),
            queue.keyed_waiter_count(),
        ))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
