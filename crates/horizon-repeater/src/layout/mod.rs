//! Layout strategies for item repeaters.
//!
//! A repeater delegates sizing and positioning to a [`Layout`], which is one of
//! two kinds:
//!
//! - **Virtualizing** ([`VirtualizingLayout`]): decides which indices intersect
//!   the realization window, realizes only those through a
//!   [`VirtualizingLayoutContext`], and reports the full logical extent so the
//!   scroll host can size its scroll range.
//! - **Non-virtualizing** ([`NonVirtualizingLayout`]): every item is realized
//!   and the layout positions all of them. It is re-run only when the available
//!   size changes or the content changes, never for a pure scroll.
//!
//! # Built-in Layouts
//!
//! - [`StackLayout`] - virtualizing vertical or horizontal stack
//! - [`UniformGridLayout`] - virtualizing grid of equally sized cells
//! - [`NonVirtualStackLayout`] - stack that realizes everything
//!
//! # Writing a Layout
//!
//! Layouts take `&self` so a single instance can be shared by several
//! repeaters. Anything that must persist between passes belongs in the
//! context's layout state (see [`take_layout_state`] / [`store_layout_state`]).
//!
//! ```
//! use horizon_repeater::layout::*;
//! use horizon_repeater::{RepeaterResult, Size};
//!
//! /// Realizes only the first item and stretches it.
//! struct FirstOnly;
//!
//! impl VirtualizingLayout for FirstOnly {
//!     fn measure(&self, context: &mut dyn VirtualizingLayoutContext, available: Size) -> RepeaterResult<Size> {
//!         if context.item_count() == 0 {
//!             return Ok(Size::ZERO);
//!         }
//!         let element = context.get_or_create_element_at(0, ElementRealizationOptions::NONE)?;
//!         Ok(element.measure(available))
//!     }
//!
//!     fn arrange(&self, context: &mut dyn VirtualizingLayoutContext, final_size: Size) -> RepeaterResult<Size> {
//!         if let Some(element) = context.try_get_element_at(0) {
//!             element.arrange(horizon_repeater::Rect::from_origin_size(Default::default(), final_size));
//!         }
//!         Ok(final_size)
//!     }
//! }
//! ```

mod context;
mod non_virtual_stack_layout;
mod stack_layout;
#[cfg(test)]
pub(crate) mod testing;
mod uniform_grid_layout;

use std::fmt;
use std::sync::Arc;

use horizon_repeater_core::{Rect, Size};

use crate::error::RepeaterResult;
use crate::items_source::CollectionChange;

pub use context::{
    ElementRealizationOptions, LayoutContext, NonVirtualizingLayoutContext,
    VirtualizingLayoutContext, store_layout_state, take_layout_state,
};
pub use non_virtual_stack_layout::NonVirtualStackLayout;
pub use stack_layout::StackLayout;
pub use uniform_grid_layout::UniformGridLayout;

/// Stacking direction of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Items flow top to bottom.
    #[default]
    Vertical,
    /// Items flow left to right.
    Horizontal,
}

impl Orientation {
    /// The component of `size` along the flow direction.
    #[inline]
    pub fn major(self, size: Size) -> f32 {
        match self {
            Self::Vertical => size.height,
            Self::Horizontal => size.width,
        }
    }

    /// The component of `size` across the flow direction.
    #[inline]
    pub fn minor(self, size: Size) -> f32 {
        match self {
            Self::Vertical => size.width,
            Self::Horizontal => size.height,
        }
    }

    /// Build a size from flow and cross components.
    #[inline]
    pub fn size(self, major: f32, minor: f32) -> Size {
        match self {
            Self::Vertical => Size::new(minor, major),
            Self::Horizontal => Size::new(major, minor),
        }
    }

    /// Build a rectangle from flow and cross components.
    #[inline]
    pub fn rect(self, major_pos: f32, minor_pos: f32, major_len: f32, minor_len: f32) -> Rect {
        match self {
            Self::Vertical => Rect::new(minor_pos, major_pos, minor_len, major_len),
            Self::Horizontal => Rect::new(major_pos, minor_pos, major_len, minor_len),
        }
    }

    /// Start and end of `rect` along the flow direction.
    #[inline]
    pub fn major_span(self, rect: Rect) -> (f32, f32) {
        match self {
            Self::Vertical => (rect.top(), rect.bottom()),
            Self::Horizontal => (rect.left(), rect.right()),
        }
    }
}

/// A layout that realizes only what the realization window needs.
pub trait VirtualizingLayout: Send + Sync {
    /// Called when the layout is attached to a repeater.
    fn initialize_for_context(&self, _context: &mut dyn VirtualizingLayoutContext) {}

    /// Called when the layout is detached from a repeater.
    fn uninitialize_for_context(&self, context: &mut dyn VirtualizingLayoutContext) {
        *context.layout_state() = None;
    }

    /// Realize and measure the elements for the current window, returning the
    /// total logical size of the content.
    fn measure(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size>;

    /// Position the realized elements.
    fn arrange(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size>;

    /// The repeater has applied `change` to its realized elements.
    fn on_items_changed(
        &self,
        _context: &mut dyn VirtualizingLayoutContext,
        _change: &CollectionChange,
    ) {
    }
}

/// A layout that positions every item.
pub trait NonVirtualizingLayout: Send + Sync {
    fn measure(
        &self,
        context: &mut dyn NonVirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size>;

    fn arrange(
        &self,
        context: &mut dyn NonVirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size>;
}

/// The layout strategy of a repeater.
#[derive(Clone)]
pub enum Layout {
    Virtualizing(Arc<dyn VirtualizingLayout>),
    NonVirtualizing(Arc<dyn NonVirtualizingLayout>),
}

impl Layout {
    pub fn virtualizing<L: VirtualizingLayout + 'static>(layout: L) -> Self {
        Self::Virtualizing(Arc::new(layout))
    }

    pub fn non_virtualizing<L: NonVirtualizingLayout + 'static>(layout: L) -> Self {
        Self::NonVirtualizing(Arc::new(layout))
    }

    pub fn is_virtualizing(&self) -> bool {
        matches!(self, Self::Virtualizing(_))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::virtualizing(StackLayout::default())
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtualizing(_) => f.write_str("Layout::Virtualizing(..)"),
            Self::NonVirtualizing(_) => f.write_str("Layout::NonVirtualizing(..)"),
        }
    }
}
