//! Subscription tokens.
//!
//! Subscribing to a store returns a [`Subscription`] token owning the
//! callback. The store keeps only a weak reference: dropping the token
//! is the unsubscribe operation, taking effect no later than the next
//! notification cycle. A store can therefore never be the reason a
//! consumer stays alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique id.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct SubscriptionInner<S> {
    id: SubscriptionId,
    callback: Box<dyn Fn(&S) + Send + Sync>,
}

impl<S> SubscriptionInner<S> {
    pub(crate) fn fire(&self, state: &S) {
        (self.callback)(state);
    }
}

/// A registered state callback, owned by whoever subscribed.
///
/// The token is immutable once created. [`fire`] invokes the callback
/// with the given state; a panicking callback is the caller's
/// responsibility and is not caught here.
///
/// [`fire`]: Subscription::fire
pub struct Subscription<S> {
    inner: Arc<SubscriptionInner<S>>,
}

impl<S> Subscription<S> {
    pub(crate) fn new(callback: Box<dyn Fn(&S) + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                id: SubscriptionId::new(),
                callback,
            }),
        }
    }

    /// This subscription's unique id.
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// Invoke the callback with `state`.
    pub fn fire(&self, state: &S) {
        self.inner.fire(state);
    }

    /// Release the token, silently unsubscribing. Equivalent to
    /// dropping it.
    pub fn cancel(self) {
        drop(self);
    }

    pub(crate) fn downgrade(&self) -> Weak<SubscriptionInner<S>> {
        Arc::downgrade(&self.inner)
    }
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .finish()
    }
}
