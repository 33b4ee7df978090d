//! Callback registry.
//!
//! Weakly-held, insertion-ordered collection of subscription callbacks.
//! Every subscribe call produces a fresh token, so registration is
//! idempotent-safe by construction; liveness is reference-based, and
//! entries whose token has been dropped are pruned during notification
//! without any error surfaced (a released consumer is a normal
//! lifecycle event, not a bug).

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::state::StoreState;
use super::subscription::{Subscription, SubscriptionInner};

pub(crate) struct CallbackRegistry<S> {
    entries: Mutex<Vec<Weak<SubscriptionInner<S>>>>,
}

impl<S: StoreState> CallbackRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a freshly-created token, holding it weakly.
    pub(crate) fn insert(&self, subscription: &Subscription<S>) {
        self.entries.lock().push(subscription.downgrade());
    }

    /// Fire every live subscription in subscription order, pruning
    /// entries whose token has been released.
    ///
    /// Callbacks run outside the registry lock, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub(crate) fn notify_all(&self, state: &S) {
        let live: SmallVec<[Arc<SubscriptionInner<S>>; 8]> = {
            let mut entries = self.entries.lock();
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for subscription in live {
            subscription.fire(state);
        }
    }

    /// Number of currently-live subscriptions.
    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
