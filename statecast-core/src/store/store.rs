//! The state store.
//!
//! [`StateStore`] owns one current state value and broadcasts changes
//! to callback subscriptions. Handles are cheap to clone and share the
//! same underlying store, so any number of producer threads can commit
//! mutations concurrently.
//!
//! # Delivery pipeline
//!
//! A write replaces the value immediately (visible to [`get`] as soon
//! as [`set`] returns) and enqueues an `(old, new)` transaction on the
//! store's private serial worker. The worker suppresses same-state
//! transitions and forwards the rest to the designated delivery
//! context, where subscriptions fire in subscription order. Commits are
//! serialized by a commit lock held across the queue send, so delivery
//! order always equals commit order, even under racing producers.
//!
//! Writing an equal value is allowed and still runs the detection
//! pipeline; it is simply a cheap no-op for observers. [`republish`]
//! bypasses the suppression to force a re-delivery of the current
//! state.
//!
//! # Liveness
//!
//! Subscriptions are held weakly: the store is never the reason a
//! consumer stays alive, and a consumer that goes away is pruned
//! silently on the next delivery.
//!
//! [`get`]: StateStore::get
//! [`set`]: StateStore::set
//! [`republish`]: StateStore::republish

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::sched::{DeliveryContext, TransactionQueue};

use super::change;
use super::link::{LinkMap, Retention, StatePublisher};
use super::registry::CallbackRegistry;
use super::state::StoreState;
use super::subscription::Subscription;

pub(crate) struct StoreCore<S: StoreState> {
    identifier: String,
    state: RwLock<S>,
    /// Serializes commits so transaction-queue order equals commit
    /// order.
    commit: Mutex<()>,
    callbacks: Arc<CallbackRegistry<S>>,
    links: LinkMap,
    transactions: TransactionQueue<S>,
}

/// A shared, equality-deduplicated state container.
///
/// # Example
///
/// ```rust,ignore
/// let store = StateStore::new(AppState::default());
///
/// // Fires once immediately with the current state, then on every
/// // semantic change.
/// let subscription = store.subscribe(|state| println!("{state:?}"));
///
/// store.set(AppState::loaded());
///
/// // Dropping the token unsubscribes.
/// drop(subscription);
/// ```
pub struct StateStore<S: StoreState> {
    core: Arc<StoreCore<S>>,
}

impl<S: StoreState> StateStore<S> {
    /// Create a store with the state type's name as its identifier.
    pub fn new(initial: S) -> Self {
        Self::with_identifier(initial, std::any::type_name::<S>())
    }

    /// Create a store with an explicit identifier.
    ///
    /// Identifiers key cross-store links; give two stores of the same
    /// shape distinct identifiers if both can be link targets.
    pub fn with_identifier(initial: S, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let callbacks = Arc::new(CallbackRegistry::new());

        let transactions = TransactionQueue::start(&identifier, {
            let callbacks = Arc::clone(&callbacks);
            let identifier = identifier.clone();
            move |old: S, new: S, force: bool| {
                if !force && !change::has_changed(&old, &new) {
                    tracing::debug!(store = %identifier, "skipping same-state transition");
                    return;
                }
                let callbacks = Arc::clone(&callbacks);
                DeliveryContext::global().dispatch(move || callbacks.notify_all(&new));
            }
        });

        Self {
            core: Arc::new(StoreCore {
                identifier,
                state: RwLock::new(initial),
                commit: Mutex::new(()),
                callbacks,
                links: LinkMap::new(),
                transactions,
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> S {
        self.core.state.read().clone()
    }

    /// Replace the state and enqueue notification of subscriptions.
    ///
    /// Never blocks past the queue hand-off; consumer-side failures
    /// are never surfaced here.
    pub fn set(&self, next: S) {
        self.commit(move |_| next, false, |_, _| {});
    }

    /// Replace the state with a value derived from the current one.
    ///
    /// The closure runs with the store locked, making the
    /// read-modify-write atomic with respect to other producers.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        self.commit(f, false, |_, _| {});
    }

    /// Force a re-delivery of the current state, bypassing same-state
    /// suppression.
    pub fn republish(&self) {
        self.commit(|state| state.clone(), true, |_, _| {});
    }

    /// Register a callback and fire it once immediately with the
    /// current state, so late subscribers are synchronized.
    ///
    /// The returned token owns the registration: dropping it
    /// unsubscribes, no later than the next notification cycle.
    #[must_use = "dropping the token unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&S) + Send + Sync + 'static) -> Subscription<S> {
        self.subscribe_internal(Box::new(callback))
    }

    /// Link this store to `producer`: its changes invoke `handler`
    /// (immediately once with the producer's current state).
    ///
    /// At most one live link per producer identifier; a duplicate
    /// subscribe is a reported violation, except when the existing
    /// link is weak and its producer is gone, in which case it is
    /// replaced silently.
    ///
    /// A handler that needs to touch its own store should capture a
    /// [`downgrade`]d handle; capturing a clone would keep this store
    /// alive through its own link table.
    ///
    /// [`downgrade`]: StateStore::downgrade
    pub fn subscribe_to<T, P>(
        &self,
        producer: &P,
        retention: Retention,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) where
        T: StoreState,
        P: StatePublisher<T>,
    {
        self.core.links.subscribe(producer, retention, handler);
    }

    /// Remove the link to `producer`. A missing link is a reported
    /// violation.
    pub fn unsubscribe_from<T, P>(&self, producer: &P)
    where
        T: StoreState,
        P: StatePublisher<T>,
    {
        self.core.links.unsubscribe(&producer.identifier());
    }

    /// Remove the link for `identifier` directly, for when the
    /// producer handle itself is no longer around.
    pub fn unsubscribe_from_id(&self, identifier: &str) {
        self.core.links.unsubscribe(identifier);
    }

    /// This store's identifier.
    pub fn identifier(&self) -> &str {
        &self.core.identifier
    }

    /// Number of live callback subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.core.callbacks.live_count()
    }

    /// Block until every mutation committed before this call has been
    /// fully delivered.
    pub fn flush(&self) {
        self.core.transactions.barrier();
        DeliveryContext::global().flush();
    }

    /// A weak handle that does not keep the store alive. Used by
    /// handlers that would otherwise retain their own store.
    pub fn downgrade(&self) -> WeakStateStore<S> {
        WeakStateStore {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Commit a transition: swap the state under the commit lock, let
    /// `observe` look at the `(old, new)` pair while commits are still
    /// serialized, then enqueue the callback transaction.
    pub(crate) fn commit(
        &self,
        make_next: impl FnOnce(&S) -> S,
        force: bool,
        observe: impl FnOnce(&S, &S),
    ) {
        let _commit = self.core.commit.lock();
        let (old, new) = {
            let mut state = self.core.state.write();
            let next = make_next(&state);
            let old = std::mem::replace(&mut *state, next);
            (old, (*state).clone())
        };
        observe(&old, &new);
        self.core.transactions.apply(old, new, force);
    }

    pub(crate) fn subscribe_internal(
        &self,
        callback: Box<dyn Fn(&S) + Send + Sync>,
    ) -> Subscription<S> {
        let subscription = Subscription::new(callback);
        self.core.callbacks.insert(&subscription);
        subscription.fire(&self.get());
        subscription
    }

    pub(crate) fn core_any(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.core) as Arc<dyn Any + Send + Sync>
    }

    pub(crate) fn core_watch(&self) -> Weak<dyn Any + Send + Sync> {
        Arc::downgrade(&self.core) as Weak<dyn Any + Send + Sync>
    }
}

impl<S: StoreState> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

/// Weak counterpart of [`StateStore`]; upgrade to use.
pub struct WeakStateStore<S: StoreState> {
    core: Weak<StoreCore<S>>,
}

impl<S: StoreState> WeakStateStore<S> {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<StateStore<S>> {
        self.core.upgrade().map(|core| StateStore { core })
    }
}

impl<S: StoreState> Clone for WeakStateStore<S> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<S: StoreState> StatePublisher<S> for StateStore<S> {
    fn identifier(&self) -> String {
        self.core.identifier.clone()
    }

    fn subscribe_boxed(&self, callback: Box<dyn Fn(&S) + Send + Sync>) -> Subscription<S> {
        self.subscribe_internal(callback)
    }

    fn retain_core(&self) -> Arc<dyn Any + Send + Sync> {
        self.core_any()
    }

    fn watch_core(&self) -> Weak<dyn Any + Send + Sync> {
        self.core_watch()
    }
}

impl<S: StoreState + fmt::Debug> fmt::Debug for StateStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("identifier", &self.core.identifier)
            .field("state", &*self.core.state.read())
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::test_support::capture_violations;
    use crate::contract::ContractViolation;
    use std::thread;

    fn recording(store: &StateStore<i32>) -> (Subscription<i32>, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = store.subscribe(move |state| sink.lock().push(*state));
        (subscription, seen)
    }

    #[test]
    fn subscribe_fires_immediately_with_the_current_state() {
        let store = StateStore::new(41);
        let (_token, seen) = recording(&store);
        assert_eq!(*seen.lock(), vec![41]);
    }

    #[test]
    fn set_delivers_changes_in_commit_order() {
        let store = StateStore::new(0);
        let (_token, seen) = recording(&store);

        store.set(1);
        store.set(2);
        store.set(3);
        store.flush();

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn writing_an_equal_value_is_suppressed() {
        let store = StateStore::new(0);
        let (_token, seen) = recording(&store);

        store.set(1);
        store.set(1);
        store.flush();

        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn republish_bypasses_suppression() {
        let store = StateStore::new(0);
        let (_token, seen) = recording(&store);

        store.set(1);
        store.republish();
        store.flush();

        assert_eq!(*seen.lock(), vec![0, 1, 1]);
    }

    #[test]
    fn update_is_an_atomic_read_modify_write() {
        let store = StateStore::new(0);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        store.update(|n| n + 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(), 1000);
    }

    #[test]
    fn dropped_token_stops_delivery() {
        let store = StateStore::new(0);
        let (token, seen) = recording(&store);

        store.set(1);
        store.flush();
        drop(token);
        store.set(2);
        store.flush();

        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(store.subscription_count(), 0);
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        #[derive(Clone, Debug, PartialEq, Eq)]
        struct Labeled {
            producer: char,
            seq: u32,
        }
        impl StoreState for Labeled {
            type Tag = ();

            fn tag(&self) -> Self::Tag {}
        }

        let store = StateStore::new(Labeled {
            producer: '-',
            seq: 0,
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _token = store.subscribe(move |state: &Labeled| sink.lock().push(state.clone()));

        let spawn_producer = |label: char| {
            let store = store.clone();
            thread::spawn(move || {
                for seq in 1..=100 {
                    store.set(Labeled {
                        producer: label,
                        seq,
                    });
                }
            })
        };
        let a = spawn_producer('a');
        let b = spawn_producer('b');
        a.join().unwrap();
        b.join().unwrap();
        store.flush();

        let delivered = seen.lock().clone();
        for label in ['a', 'b'] {
            let sequence: Vec<u32> = delivered
                .iter()
                .filter(|state| state.producer == label)
                .map(|state| state.seq)
                .collect();
            assert_eq!(sequence, (1..=100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn cross_store_link_mirrors_the_producer() {
        let producer = StateStore::with_identifier(10, "producer");
        let consumer = StateStore::with_identifier(0, "consumer");

        consumer.subscribe_to(&producer, Retention::Weak, {
            let consumer = consumer.downgrade();
            move |value: &i32| {
                if let Some(consumer) = consumer.upgrade() {
                    consumer.set(*value * 2);
                }
            }
        });
        // The handler fired inline with the producer's current state.
        assert_eq!(consumer.get(), 20);

        producer.set(21);
        producer.flush();
        assert_eq!(consumer.get(), 42);
    }

    #[test]
    fn duplicate_link_is_a_violation_and_keeps_the_original() {
        let producer = StateStore::with_identifier(1, "dup-producer");
        let consumer = StateStore::with_identifier(0, "dup-consumer");

        let violations = capture_violations(|| {
            consumer.subscribe_to(&producer, Retention::Weak, {
                let consumer = consumer.downgrade();
                move |value: &i32| {
                    if let Some(consumer) = consumer.upgrade() {
                        consumer.set(*value);
                    }
                }
            });
            consumer.subscribe_to(&producer, Retention::Weak, |_: &i32| {});
        });

        assert_eq!(
            violations,
            vec![ContractViolation::DuplicateStoreLink {
                identifier: "dup-producer".into(),
            }]
        );

        // The original handler keeps working.
        producer.set(9);
        producer.flush();
        assert_eq!(consumer.get(), 9);
    }

    #[test]
    fn unsubscribe_without_a_link_is_a_violation() {
        let producer = StateStore::with_identifier(0, "absent-producer");
        let consumer = StateStore::with_identifier(0, "absent-consumer");

        let violations = capture_violations(|| {
            consumer.unsubscribe_from(&producer);
        });

        assert_eq!(
            violations,
            vec![ContractViolation::UnknownStoreLink {
                identifier: "absent-producer".into(),
            }]
        );
    }

    #[test]
    fn unsubscribe_then_resubscribe_is_clean() {
        let producer = StateStore::with_identifier(5, "cycle-producer");
        let consumer = StateStore::with_identifier(0, "cycle-consumer");

        let violations = capture_violations(|| {
            consumer.subscribe_to(&producer, Retention::Weak, |_: &i32| {});
            consumer.unsubscribe_from(&producer);
            consumer.subscribe_to(&producer, Retention::Weak, |_: &i32| {});
        });

        assert!(violations.is_empty());
    }

    #[test]
    fn dead_weak_link_is_replaced_silently() {
        let consumer = StateStore::with_identifier(0, "replace-consumer");

        let violations = capture_violations(|| {
            let producer = StateStore::with_identifier(1, "replace-producer");
            consumer.subscribe_to(&producer, Retention::Weak, |_: &i32| {});
            drop(producer);

            let reborn = StateStore::with_identifier(2, "replace-producer");
            consumer.subscribe_to(&reborn, Retention::Weak, |_: &i32| {});
        });

        assert!(violations.is_empty());
    }

    #[test]
    fn strong_link_keeps_the_producer_alive() {
        let consumer = StateStore::with_identifier(0, "strong-consumer");

        let violations = capture_violations(|| {
            let producer = StateStore::with_identifier(1, "strong-producer");
            consumer.subscribe_to(&producer, Retention::Strong, |_: &i32| {});
            drop(producer);

            // The link still holds the producer, so the identifier is
            // still taken.
            let reborn = StateStore::with_identifier(2, "strong-producer");
            consumer.subscribe_to(&reborn, Retention::Weak, |_: &i32| {});
        });

        assert_eq!(
            violations,
            vec![ContractViolation::DuplicateStoreLink {
                identifier: "strong-producer".into(),
            }]
        );
    }

    #[test]
    fn default_identifier_is_the_state_type_name() {
        let store = StateStore::new(0);
        assert_eq!(store.identifier(), std::any::type_name::<i32>());
    }

    #[test]
    fn clones_share_the_same_store() {
        let store = StateStore::new(0);
        let alias = store.clone();

        alias.set(7);
        assert_eq!(store.get(), 7);
    }
}
