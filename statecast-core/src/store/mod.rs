//! State stores and subscriptions.
//!
//! This module implements the producer-facing half of the system: the
//! state container, change detection, callback subscriptions, and
//! cross-store links.
//!
//! # Concepts
//!
//! ## States
//!
//! A state is an immutable, equality-comparable snapshot value. Stores
//! replace it wholesale on every mutation; nothing is ever mutated in
//! place, so a reader holding a snapshot can never observe a partial
//! write.
//!
//! ## Subscriptions
//!
//! Subscribing registers a callback and returns an owning token. The
//! store keeps only a weak reference; releasing the token is the
//! unsubscribe operation. Late subscribers are synchronized with an
//! immediate fire of the current state.
//!
//! ## Cross-store links
//!
//! One store can consume another store's transitions through a link
//! keyed by the producer's identifier, with weak or strong retention of
//! the producer. Links ride the producer's ordinary delivery pipeline,
//! so a linked consumer sees producer states in the same order as every
//! other observer.

mod change;
mod link;
mod registry;
mod state;
mod store;
mod subscription;

pub use change::{distinct_tag, has_changed};
pub use link::{Retention, StatePublisher};
pub use state::StoreState;
pub use store::{StateStore, WeakStateStore};
pub use subscription::{Subscription, SubscriptionId};
