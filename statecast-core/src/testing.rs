//! State fixtures shared by unit tests.

use crate::store::StoreState;

impl StoreState for i32 {
    type Tag = ();

    fn tag(&self) -> Self::Tag {}
}

/// Two-phase screen state with a meaningful sub-state tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Screen {
    Loading { percent: u8 },
    Ready { items: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScreenTag {
    Loading,
    Ready,
}

impl StoreState for Screen {
    type Tag = ScreenTag;

    fn tag(&self) -> ScreenTag {
        match self {
            Screen::Loading { .. } => ScreenTag::Loading,
            Screen::Ready { .. } => ScreenTag::Ready,
        }
    }
}
