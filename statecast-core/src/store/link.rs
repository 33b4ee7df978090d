//! Cross-store links.
//!
//! A store can subscribe to another store's changes, letting one
//! store's transitions drive another's internal handler without either
//! side knowing the other's concrete shape. Links are tracked on the
//! consuming side, keyed by the producing store's identifier, with at
//! most one live link per identifier.
//!
//! A link's liveness mode decides what happens when the producer goes
//! away:
//!
//! - [`Retention::Weak`]: the link does not keep the producer alive.
//!   Once the producer is gone the link is dead, and a new subscribe
//!   call for the same identifier silently replaces it.
//! - [`Retention::Strong`]: the link is an ownership edge; the producer
//!   outlives as long as the link is registered.
//!
//! Subscribing while a live link exists, or unsubscribing without a
//! link, is a reported contract violation.

use std::any::Any;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::contract::{report, ContractViolation};

use super::state::StoreState;
use super::subscription::Subscription;

/// Liveness mode of a cross-store link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// The link does not keep the producer alive; it dies with it.
    Weak,
    /// The link keeps the producer alive for as long as it exists.
    Strong,
}

/// A store that other stores can link to.
///
/// Both store flavors implement this; it is the seam cross-store
/// subscription goes through, so consumers never depend on the
/// producer's concrete store type.
pub trait StatePublisher<S: StoreState> {
    /// Stable identifier used to key links to this producer.
    fn identifier(&self) -> String;

    /// Register a callback, firing it immediately with the current
    /// state so late subscribers are synchronized.
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&S) + Send + Sync>) -> Subscription<S>;

    /// Strong handle to the producer's shared core, used by
    /// [`Retention::Strong`] links as an ownership edge.
    fn retain_core(&self) -> Arc<dyn Any + Send + Sync>;

    /// Weak handle used to test whether the producer is still alive.
    fn watch_core(&self) -> Weak<dyn Any + Send + Sync>;
}

struct StoreLink {
    /// Present only for strong links.
    retained: Option<Arc<dyn Any + Send + Sync>>,
    liveness: Weak<dyn Any + Send + Sync>,
    /// Keeps the producer-side subscription token alive; dropping the
    /// link unsubscribes.
    #[allow(dead_code)]
    token: Box<dyn Any + Send + Sync>,
}

impl StoreLink {
    fn is_dead(&self) -> bool {
        self.retained.is_none() && self.liveness.strong_count() == 0
    }
}

/// The consuming side's link table, keyed by producer identifier.
pub(crate) struct LinkMap {
    links: Mutex<IndexMap<String, StoreLink>>,
}

impl LinkMap {
    pub(crate) fn new() -> Self {
        Self {
            links: Mutex::new(IndexMap::new()),
        }
    }

    /// Create a link to `producer`. Reports a violation and leaves the
    /// existing link intact when a live one is already registered for
    /// the same identifier; a dead weak link is replaced silently.
    pub(crate) fn subscribe<S, P>(
        &self,
        producer: &P,
        retention: Retention,
        handler: impl Fn(&S) + Send + Sync + 'static,
    ) where
        S: StoreState,
        P: StatePublisher<S>,
    {
        let identifier = producer.identifier();
        {
            let mut links = self.links.lock();
            if links.get(&identifier).is_some_and(|link| !link.is_dead()) {
                drop(links);
                report(ContractViolation::DuplicateStoreLink { identifier });
                return;
            }
            if links.shift_remove(&identifier).is_some() {
                tracing::debug!(store = %identifier, "replacing dead weak link");
            }
        }

        // Subscribing fires the handler inline with the producer's
        // current state; the table stays unlocked so the handler can
        // itself touch stores.
        let token = producer.subscribe_boxed(Box::new(handler));
        let link = StoreLink {
            retained: match retention {
                Retention::Strong => Some(producer.retain_core()),
                Retention::Weak => None,
            },
            liveness: producer.watch_core(),
            token: Box::new(token),
        };
        self.links.lock().insert(identifier, link);
    }

    /// Remove the link for `identifier`. Reports a violation when no
    /// link exists.
    pub(crate) fn unsubscribe(&self, identifier: &str) {
        if self.links.lock().shift_remove(identifier).is_none() {
            report(ContractViolation::UnknownStoreLink {
                identifier: identifier.to_owned(),
            });
        }
    }
}
