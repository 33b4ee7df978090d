//! The renderable capability.
//!
//! A renderable observer is anything that can paint a state: a widget,
//! a presenter, a mirror into some other system. The store drives it
//! through this narrow trait and never learns its concrete type.

use crate::store::StoreState;

/// Whether a renderable can accept a render right now.
///
/// "Gone" is not represented here: a deallocated observer is detected
/// by its weak registration dying, at which point the registry prunes
/// it without ever calling [`render`] again.
///
/// [`render`]: Renderable::render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderReadiness {
    /// The observer can accept a render.
    Ready,
    /// The observer exists but cannot accept a render yet. Receiving a
    /// delivery in this state is a reported contract violation: the
    /// observer was subscribed before it could accept one.
    NotReady,
}

/// An observer that renders states.
pub trait Renderable<S: StoreState>: Send + Sync {
    /// Paint the new state.
    ///
    /// `previous_distinct` carries the previous sub-state tag when this
    /// transition crossed a tag boundary, and is `None` for a
    /// refinement within the same tag. Downstream code typically uses
    /// it to decide whether a transition animation applies.
    fn render(&self, state: &S, previous_distinct: Option<&S::Tag>);

    /// Whether a render can be delivered right now.
    fn readiness(&self) -> RenderReadiness {
        RenderReadiness::Ready
    }

    /// Stable identity key for registry membership. Conventionally the
    /// type name; override to disambiguate multiple instances of the
    /// same observer type.
    fn identity(&self) -> String;
}
