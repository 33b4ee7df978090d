//! The state capability.
//!
//! A store holds one immutable snapshot value at a time. The value is
//! replaced, never mutated in place, so observers reading a snapshot
//! can never see a partial write. Equality drives redundant-delivery
//! suppression; the sub-state tag drives distinct-transition detection.

/// A value type a store can hold and broadcast.
///
/// The associated [`Tag`] is a coarse classification of the state (for
/// an enum-shaped state, typically which variant it is). It is a stable
/// classification key, not the full state: two states with equal tags
/// may still differ, and only a tag change counts as a distinct
/// transition worth special-casing downstream (transition animations,
/// for example).
///
/// Use `()` as the tag for states with no meaningful classification.
///
/// [`Tag`]: StoreState::Tag
pub trait StoreState: Clone + PartialEq + Send + Sync + 'static {
    /// Coarse classification of a state value.
    type Tag: Clone + PartialEq + Send + Sync + 'static;

    /// The classification of this particular value.
    fn tag(&self) -> Self::Tag;
}
