//! Default pointer and keyboard selection gestures for item visuals.
//!
//! Input delivery belongs to the host. These functions only translate an
//! already-delivered gesture on the item at `path` into model operations.

use super::{IndexPath, SelectionModel};

/// Modifier keys held during a gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
    };
}

/// Keys with a selection meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKey {
    Escape,
    Space,
    A,
    Other,
}

/// Primary button pressed on the item at `path`.
///
/// Returns `true` if the host should move focus to the item.
pub fn handle_pointer_pressed(
    model: &mut SelectionModel,
    path: &IndexPath,
    modifiers: Modifiers,
) -> bool {
    if modifiers.shift && !model.is_single_select() {
        if modifiers.ctrl {
            model.deselect_range_from_anchor_to(path.clone());
        } else {
            model.select_range_from_anchor_to(path.clone());
        }
        false
    } else if modifiers.ctrl {
        if model.is_selected_at(path) == Some(true) {
            model.deselect_at(path.clone());
        } else {
            model.select_at(path.clone());
        }
        false
    } else {
        model.select_at(path.clone());
        true
    }
}

/// Key released while the item at `path` has focus.
pub fn handle_key_released(
    model: &mut SelectionModel,
    path: &IndexPath,
    key: SelectionKey,
    modifiers: Modifiers,
) {
    match key {
        SelectionKey::Escape => model.clear_selection(),
        SelectionKey::Space => model.select_at(path.clone()),
        _ if model.is_single_select() => {}
        SelectionKey::A if modifiers.ctrl => model.select_all(),
        _ if modifiers.shift => model.select_range_from_anchor_to(path.clone()),
        _ => {}
    }
}
