//! Renderable observers and the view store.
//!
//! The consumer-facing half of the system: the narrow capability a
//! rendering surface exposes to the core, the store specialization
//! that drives a set of such surfaces, and verbatim forwarding of host
//! lifecycle notifications.

mod lifecycle;
mod renderable;
mod view_store;

pub use lifecycle::{LifecycleEvent, LifecycleObserver};
pub use renderable::{RenderReadiness, Renderable};
pub use view_store::{ViewStore, WeakViewStore};
