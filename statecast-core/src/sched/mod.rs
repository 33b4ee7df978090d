//! Delivery scheduling.
//!
//! Two pieces of thread discipline keep notifications deduplicated and
//! ordered:
//!
//! - [`TransactionQueue`]: one private serial worker per store
//!   instance. Every state mutation becomes a transaction carrying the
//!   old and new values; the worker observes them strictly in commit
//!   order, so change detection never sees interleaved pairs from the
//!   same store.
//!
//! - [`DeliveryContext`]: the single designated execution context on
//!   which observers are ultimately invoked. Consumers that are not
//!   themselves thread-safe (rendering surfaces in particular) can rely
//!   on every callback and render happening on this one thread, in
//!   submission order.
//!
//! The split mirrors the two hops a notification makes: producer thread
//! commits, the store's transaction worker classifies, the delivery
//! context fans out.

mod delivery;
mod transaction;

pub use delivery::{DeliveryContext, DeliveryPolicy};
pub(crate) use transaction::TransactionQueue;
