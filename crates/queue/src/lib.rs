//! Queue engine: keyed publish/match/subscribe with FIFO ordering.
//!
//! A [`Queue`] holds two independent FIFO sequences — buffered items and
//! waiting subscribers. A `put` either hands the item to the first matching
//! waiter on the caller's stack or buffers it; `take`/`peek` consume or
//! inspect the first matching buffered item; `wait` is take-or-subscribe.
//!
//! Items are shared via `Arc`: membership in the queue's deque is what
//! "buffered" means, and any outstanding clone (a peek held across a
//! response) keeps the data readable after the item has been taken or the
//! queue torn down. No I/O happens here; callers serialize access.

mod item;
mod queue;

pub use item::Item;
pub use queue::{DeliverFn, Put, Queue, SubscriberId, Wait, Waiter};
