//! Change detection.
//!
//! Pure helpers over state values: no side effects, no failure modes.
//! Stores call these on every transaction to decide whether a
//! notification is warranted at all and whether the transition crossed
//! a sub-state boundary.

use super::state::StoreState;

/// True when the transition is a semantic change worth broadcasting.
pub fn has_changed<S: StoreState>(old: &S, new: &S) -> bool {
    old != new
}

/// The previous sub-state tag, if the transition crossed a tag
/// boundary; `None` for a refinement within the same tag.
pub fn distinct_tag<S: StoreState>(old: &S, new: &S) -> Option<S::Tag> {
    let previous = old.tag();
    if previous != new.tag() {
        Some(previous)
    } else {
        None
    }
}
