//! Statecast Core
//!
//! This crate provides the core runtime for the Statecast reactive
//! state-broadcast framework. It implements:
//!
//! - Typed state stores with equality-based change detection
//! - Weakly-held callback subscriptions and renderable observers
//! - Cross-store subscription links with weak or strong retention
//! - A serialized delivery pipeline with per-store transaction queues
//!   and one designated delivery context
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `store`: state capability, change detection, subscriptions,
//!   cross-store links, and the plain state store
//! - `render`: the renderable capability, lifecycle forwarding, and
//!   the view store
//! - `sched`: the delivery context and per-store transaction queues
//! - `contract`: the reported-violation taxonomy
//!
//! # Guarantees
//!
//! 1. Observers only ever see states that differ from the previously
//!    delivered state, unless a re-delivery is forced.
//! 2. Transitions on one store reach all its observers in the exact
//!    order committed, even under concurrent producers; within one
//!    transition, observers are visited in subscription order.
//! 3. A store never keeps an observer alive: registrations are weak,
//!    and a deallocated observer is pruned silently.
//!
//! # Example
//!
//! ```rust,ignore
//! use statecast_core::{StateStore, StoreState};
//!
//! #[derive(Clone, PartialEq)]
//! struct Counter { value: i64 }
//!
//! impl StoreState for Counter {
//!     type Tag = ();
//!     fn tag(&self) -> Self::Tag {}
//! }
//!
//! let store = StateStore::new(Counter { value: 0 });
//!
//! // Fires once with the current state, then on every change.
//! let subscription = store.subscribe(|state| {
//!     println!("value = {}", state.value);
//! });
//!
//! store.set(Counter { value: 5 });
//! store.flush();
//! ```

pub mod contract;
pub mod render;
pub mod sched;
pub mod store;

#[cfg(test)]
mod testing;

pub use contract::{set_violation_handler, ContractViolation, ViolationHandler};
pub use render::{
    LifecycleEvent, LifecycleObserver, RenderReadiness, Renderable, ViewStore, WeakViewStore,
};
pub use sched::{DeliveryContext, DeliveryPolicy};
pub use store::{
    Retention, StatePublisher, StateStore, StoreState, Subscription, SubscriptionId,
    WeakStateStore,
};
