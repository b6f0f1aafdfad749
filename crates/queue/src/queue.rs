use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use uuid::Uuid;

use crate::Item;

// ── Waiters ──────────────────────────────────────────────────────────────────

/// Opaque handle identifying the client connection a waiter belongs to.
///
/// The engine never interprets it; it only exists so a disconnect can be
/// matched against every waiter that connection registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery hook invoked on the publisher's stack when an item matches.
///
/// Must not re-enter the queue; the expected implementation encodes the
/// item and enqueues it into the subscriber's outbound channel.
pub type DeliverFn = Box<dyn Fn(&Waiter, Arc<Item>) + Send + Sync>;

/// A pending subscription: one client waiting for the next matching item.
pub struct Waiter {
    identifier: String,
    key: Option<String>,
    subscriber: SubscriberId,
    cancelled: AtomicBool,
    deliver: DeliverFn,
}

impl Waiter {
    pub fn new(
        identifier: impl Into<String>,
        subscriber: SubscriberId,
        key: Option<String>,
        deliver: DeliverFn,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            key,
            subscriber,
            cancelled: AtomicBool::new(false),
            deliver,
        }
    }

    /// Client-chosen correlation string, echoed back in deliveries.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// One-way latch: once set, this waiter will never be delivered to.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn wants(&self, item: &Item) -> bool {
        item.matches(self.key.as_deref())
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("identifier", &self.identifier)
            .field("key", &self.key)
            .field("subscriber", &self.subscriber)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

// ── Queue ────────────────────────────────────────────────────────────────────

/// Outcome of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Put {
    /// The item went to a waiter; it was never buffered.
    Delivered,
    /// No waiter matched; the item sits in the queue.
    Buffered,
}

/// Outcome of a `wait`.
pub enum Wait {
    /// A buffered item matched; the deliver hook already ran.
    Delivered,
    /// No item matched; the waiter is attached and also handed back so the
    /// caller can track it for cancellation.
    Queued(Arc<Waiter>),
}

/// A named FIFO of items with an independent FIFO of waiters.
#[derive(Debug)]
pub struct Queue {
    id: Uuid,
    items: VecDeque<Arc<Item>>,
    waiters: VecDeque<Arc<Waiter>>,
    keyed_items: usize,
    keyed_waiters: usize,
}

impl Queue {
    /// Create a queue, generating a random v4 id when none is supplied.
    pub fn new(id: Option<Uuid>) -> Self {
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            items: VecDeque::new(),
            waiters: VecDeque::new(),
            keyed_items: 0,
            keyed_waiters: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Publish an item. The first matching live waiter (FIFO) receives it
    /// on this call stack; otherwise the item is appended to the buffer.
    pub fn put(&mut self, key: Option<String>, value: String) -> Put {
        let item = Arc::new(Item::new(key, value));

        if let Some(waiter) = self.match_waiter(&item) {
            tracing::trace!(queue = %self.id, identifier = waiter.identifier(), "delivered on put");
            (waiter.deliver)(&waiter, item);
            return Put::Delivered;
        }

        if item.key.is_some() {
            self.keyed_items += 1;
        }
        self.items.push_back(item);
        Put::Buffered
    }

    /// Detach and return the first buffered item matching `filter`.
    pub fn take(&mut self, filter: Option<&str>) -> Option<Arc<Item>> {
        if self.items.is_empty() {
            return None;
        }
        // a keyed filter cannot match when nothing buffered carries a key
        if filter.is_some() && self.keyed_items == 0 {
            return None;
        }

        let pos = self.items.iter().position(|item| item.matches(filter))?;
        let item = self.items.remove(pos)?;
        if item.key.is_some() {
            self.keyed_items -= 1;
        }
        Some(item)
    }

    /// Like `take`, but the item stays buffered. The returned clone keeps
    /// the data alive across the caller's response window even if the item
    /// is taken in the meantime.
    pub fn peek(&self, filter: Option<&str>) -> Option<Arc<Item>> {
        if self.items.is_empty() {
            return None;
        }
        if filter.is_some() && self.keyed_items == 0 {
            return None;
        }

        self.items.iter().find(|item| item.matches(filter)).cloned()
    }

    /// Take-or-subscribe: deliver a buffered item immediately when one
    /// matches, otherwise attach the waiter.
    pub fn wait(&mut self, waiter: Waiter) -> Wait {
        if let Some(item) = self.take(waiter.key()) {
            tracing::trace!(queue = %self.id, identifier = waiter.identifier(), "delivered on wait");
            (waiter.deliver)(&waiter, item);
            return Wait::Delivered;
        }

        let waiter = Arc::new(waiter);
        if waiter.key().is_some() {
            self.keyed_waiters += 1;
        }
        self.waiters.push_back(Arc::clone(&waiter));
        Wait::Queued(waiter)
    }

    /// Latch-cancel and detach every waiter without invoking delivery.
    /// Used when the queue is deleted or the broker shuts down.
    pub fn cancel_waiters(&mut self) {
        for waiter in self.waiters.drain(..) {
            waiter.cancel();
        }
        self.keyed_waiters = 0;
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn keyed_item_count(&self) -> usize {
        self.keyed_items
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub fn keyed_waiter_count(&self) -> usize {
        self.keyed_waiters
    }

    /// Detach the first live waiter that wants `item`, purging cancelled
    /// waiters encountered on the way. A cancelled waiter must never
    /// consume an item: the subscriber is gone, so the item has to stay
    /// available for take or for the next live waiter.
    fn match_waiter(&mut self, item: &Item) -> Option<Arc<Waiter>> {
        if self.waiters.is_empty() {
            return None;
        }
        // an unkeyed item cannot match when every waiter filters on a key
        if item.key.is_none() && self.keyed_waiters == self.waiters.len() {
            return None;
        }

        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].is_cancelled() || self.waiters[i].wants(item) {
                let Some(waiter) = self.waiters.remove(i) else {
                    break;
                };
                if waiter.key().is_some() {
                    self.keyed_waiters -= 1;
                }
                if waiter.is_cancelled() {
                    continue;
                }
                return Some(waiter);
            }
            i += 1;
        }

        None
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
