//! The view store.
//!
//! [`ViewStore`] is the renderable-owning specialization of the state
//! store: on top of callback subscriptions and cross-store links it
//! tracks a set of renderable observers keyed by identity, decides
//! per observer whether a render is warranted, and marshals the actual
//! render calls onto the delivery context.
//!
//! # Mutation discipline
//!
//! Unlike the plain store, renderable fan-out is processed
//! *synchronously* on the mutating thread, serialized by the commit
//! lock: by the time [`set`] returns, every render decision for that
//! transition has been made and dispatched. Callback subscriptions
//! still ride the asynchronous transaction pipeline.
//!
//! Combined with [`DeliveryPolicy::Inline`], a mutation made from the
//! delivery context renders before [`set`] returns. A render
//! implementation must therefore never synchronously mutate the store
//! that is rendering it.
//!
//! # Observer liveness
//!
//! Views are held weakly. A deallocated view is pruned silently on the
//! next transition and its identity becomes reusable. A view that is
//! still alive but reports itself not ready was subscribed too early;
//! that is a reported contract violation, and the entry stays.
//!
//! [`set`]: ViewStore::set

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::contract::{report, ContractViolation};
use crate::sched::{DeliveryContext, DeliveryPolicy};
use crate::store::{
    distinct_tag, has_changed, Retention, StatePublisher, StateStore, StoreState, Subscription,
};

use super::lifecycle::{LifecycleEvent, LifecycleObserver};
use super::renderable::{RenderReadiness, Renderable};

struct ViewCore<S: StoreState> {
    base: StateStore<S>,
    views: Mutex<IndexMap<String, Weak<dyn Renderable<S>>>>,
    policy: DeliveryPolicy,
    lifecycle: Mutex<Vec<Weak<dyn LifecycleObserver>>>,
}

/// A state store that drives renderable observers.
///
/// # Example
///
/// ```rust,ignore
/// let store = ViewStore::new(ScreenState::default());
///
/// // The panel is rendered immediately with the current state, then
/// // on every semantic change.
/// let panel = Arc::new(SettingsPanel::new());
/// store.subscribe_view(&panel);
///
/// store.set(ScreenState::loaded());
/// ```
pub struct ViewStore<S: StoreState> {
    core: Arc<ViewCore<S>>,
}

impl<S: StoreState> ViewStore<S> {
    /// Create a view store with inline delivery and the state type's
    /// name as its identifier.
    pub fn new(initial: S) -> Self {
        Self::build(initial, None, DeliveryPolicy::Inline)
    }

    /// Create a view store with an explicit identifier.
    pub fn with_identifier(initial: S, identifier: impl Into<String>) -> Self {
        Self::build(initial, Some(identifier.into()), DeliveryPolicy::Inline)
    }

    /// Create a view store with an explicit delivery policy.
    pub fn with_policy(initial: S, policy: DeliveryPolicy) -> Self {
        Self::build(initial, None, policy)
    }

    fn build(initial: S, identifier: Option<String>, policy: DeliveryPolicy) -> Self {
        let base = match identifier {
            Some(identifier) => StateStore::with_identifier(initial, identifier),
            None => StateStore::new(initial),
        };
        Self {
            core: Arc::new(ViewCore {
                base,
                views: Mutex::new(IndexMap::new()),
                policy,
                lifecycle: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> S {
        self.core.base.get()
    }

    /// Replace the state: render decisions for every registered view
    /// are made before this returns, callback subscriptions are
    /// notified asynchronously.
    pub fn set(&self, next: S) {
        self.core
            .base
            .commit(move |_| next, false, |old, new| self.render_all(old, new, false));
    }

    /// Replace the state with a value derived from the current one.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        self.core
            .base
            .commit(f, false, |old, new| self.render_all(old, new, false));
    }

    /// Force a re-delivery of the current state to every view and
    /// callback, bypassing same-state suppression.
    pub fn republish(&self) {
        self.core.base.commit(
            |state| state.clone(),
            true,
            |old, new| self.render_all(old, new, true),
        );
    }

    /// Register a renderable observer, held weakly under its identity,
    /// and synchronize it with a forced render of the current state.
    ///
    /// A live observer with the same identity already being registered
    /// is a reported violation; the original registration stays. A
    /// dead entry under the same identity is replaced silently.
    pub fn subscribe_view<V>(&self, view: &Arc<V>)
    where
        V: Renderable<S> + 'static,
    {
        let identity = view.identity();
        {
            let mut views = self.core.views.lock();
            if views
                .get(&identity)
                .is_some_and(|weak| weak.strong_count() > 0)
            {
                drop(views);
                report(ContractViolation::DuplicateView { identity });
                return;
            }
            // A dead entry under the same identity is replaced; remove
            // first so the renewed view re-enters at the back of the
            // walk order.
            views.shift_remove(&identity);
            views.insert(identity, Arc::downgrade(view) as Weak<dyn Renderable<S>>);
        }

        let current = self.get();
        self.render_one(
            Arc::clone(view) as Arc<dyn Renderable<S>>,
            &current,
            &current,
            true,
        );
    }

    /// Remove a renderable observer. A missing registration is a
    /// reported violation.
    pub fn unsubscribe_view<V>(&self, view: &Arc<V>)
    where
        V: Renderable<S> + 'static,
    {
        self.unsubscribe_view_id(&view.identity());
    }

    /// Remove a renderable observer by identity.
    pub fn unsubscribe_view_id(&self, identity: &str) {
        if self.core.views.lock().shift_remove(identity).is_none() {
            report(ContractViolation::UnknownView {
                identity: identity.to_owned(),
            });
        }
    }

    /// Number of currently-live views.
    pub fn view_count(&self) -> usize {
        self.core
            .views
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Register a weakly-held lifecycle observer.
    pub fn observe_lifecycle<O>(&self, observer: &Arc<O>)
    where
        O: LifecycleObserver + 'static,
    {
        self.core
            .lifecycle
            .lock()
            .push(Arc::downgrade(observer) as Weak<dyn LifecycleObserver>);
    }

    /// Forward a host lifecycle event to every live observer, in
    /// registration order, on the delivery context.
    pub fn forward_lifecycle(&self, event: LifecycleEvent) {
        let live: SmallVec<[Arc<dyn LifecycleObserver>; 2]> = {
            let mut observers = self.core.lifecycle.lock();
            observers.retain(|weak| weak.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        if live.is_empty() {
            return;
        }
        DeliveryContext::global().run(self.core.policy, move || {
            for observer in live {
                observer.lifecycle(event);
            }
        });
    }

    /// Register a callback; fires once immediately with the current
    /// state.
    #[must_use = "dropping the token unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&S) + Send + Sync + 'static) -> Subscription<S> {
        self.core.base.subscribe(callback)
    }

    /// Link this store to `producer`; see [`StateStore::subscribe_to`].
    pub fn subscribe_to<T, P>(
        &self,
        producer: &P,
        retention: Retention,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) where
        T: StoreState,
        P: StatePublisher<T>,
    {
        self.core.base.subscribe_to(producer, retention, handler);
    }

    /// Remove the link to `producer`; see
    /// [`StateStore::unsubscribe_from`].
    pub fn unsubscribe_from<T, P>(&self, producer: &P)
    where
        T: StoreState,
        P: StatePublisher<T>,
    {
        self.core.base.unsubscribe_from(producer);
    }

    /// Remove the link for `identifier` directly.
    pub fn unsubscribe_from_id(&self, identifier: &str) {
        self.core.base.unsubscribe_from_id(identifier);
    }

    /// This store's identifier.
    pub fn identifier(&self) -> &str {
        self.core.base.identifier()
    }

    /// This store's delivery policy.
    pub fn policy(&self) -> DeliveryPolicy {
        self.core.policy
    }

    /// Number of live callback subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.core.base.subscription_count()
    }

    /// Block until every mutation committed before this call has been
    /// fully delivered.
    pub fn flush(&self) {
        self.core.base.flush();
    }

    /// A weak handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakViewStore<S> {
        WeakViewStore {
            core: Arc::downgrade(&self.core),
        }
    }

    /// Walk every live view in subscription order, pruning entries
    /// whose observer has been deallocated.
    fn render_all(&self, old: &S, new: &S, force: bool) {
        let live: SmallVec<[Arc<dyn Renderable<S>>; 4]> = {
            let mut views = self.core.views.lock();
            views.retain(|identity, weak| {
                if weak.strong_count() == 0 {
                    tracing::warn!(view = %identity, "view deallocated; pruning");
                    false
                } else {
                    true
                }
            });
            views.values().filter_map(Weak::upgrade).collect()
        };
        for view in live {
            self.render_one(view, old, new, force);
        }
    }

    /// Resolve one view's readiness and dispatch the render if
    /// warranted.
    fn render_one(&self, view: Arc<dyn Renderable<S>>, old: &S, new: &S, force: bool) {
        match view.readiness() {
            RenderReadiness::NotReady => {
                report(ContractViolation::ViewNotReady {
                    identity: view.identity(),
                });
            }
            RenderReadiness::Ready => {
                if !force && !has_changed(old, new) {
                    tracing::debug!(store = %self.identifier(), "skipping render of same state");
                    return;
                }
                let previous = distinct_tag(old, new);
                let state = new.clone();
                DeliveryContext::global().run(self.core.policy, move || {
                    view.render(&state, previous.as_ref());
                });
            }
        }
    }
}

impl<S: StoreState> Clone for ViewStore<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

/// Weak counterpart of [`ViewStore`]; upgrade to use.
pub struct WeakViewStore<S: StoreState> {
    core: Weak<ViewCore<S>>,
}

impl<S: StoreState> WeakViewStore<S> {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<ViewStore<S>> {
        self.core.upgrade().map(|core| ViewStore { core })
    }
}

impl<S: StoreState> Clone for WeakViewStore<S> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<S: StoreState> StatePublisher<S> for ViewStore<S> {
    fn identifier(&self) -> String {
        self.core.base.identifier().to_owned()
    }

    fn subscribe_boxed(&self, callback: Box<dyn Fn(&S) + Send + Sync>) -> Subscription<S> {
        self.core.base.subscribe_internal(callback)
    }

    fn retain_core(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.core) as Arc<dyn Any + Send + Sync>
    }

    fn watch_core(&self) -> Weak<dyn Any + Send + Sync> {
        Arc::downgrade(&self.core) as Weak<dyn Any + Send + Sync>
    }
}

impl<S: StoreState + fmt::Debug> fmt::Debug for ViewStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStore")
            .field("identifier", &self.identifier())
            .field("state", &self.get())
            .field("view_count", &self.view_count())
            .field("policy", &self.core.policy)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
