//! The bridge between layout strategies and the repeater that hosts them.
//!
//! Layouts never see the repeater's realized map or its factory. They realize,
//! look up and recycle elements by index through these contexts, and keep any
//! per-repeater bookkeeping in the opaque [`LayoutContext::layout_state`] slot
//! so one layout instance can serve many repeaters.

use std::any::Any;
use std::ops::BitOr;

use horizon_repeater_core::{Point, Rect};

use crate::element::Element;
use crate::error::RepeaterResult;
use crate::items_source::ItemValue;

/// Options for [`VirtualizingLayoutContext::get_or_create_element_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementRealizationOptions {
    /// Create a new element even if the index already has one.
    pub force_create: bool,
    /// Keep the element realized at the end of the pass even if it was not requested.
    pub suppress_auto_recycle: bool,
}

impl ElementRealizationOptions {
    pub const NONE: Self = Self {
        force_create: false,
        suppress_auto_recycle: false,
    };

    pub const FORCE_CREATE: Self = Self {
        force_create: true,
        suppress_auto_recycle: false,
    };

    pub const SUPPRESS_AUTO_RECYCLE: Self = Self {
        force_create: false,
        suppress_auto_recycle: true,
    };
}

impl BitOr for ElementRealizationOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            force_create: self.force_create || rhs.force_create,
            suppress_auto_recycle: self.suppress_auto_recycle || rhs.suppress_auto_recycle,
        }
    }
}

/// Shared by both layout context kinds.
pub trait LayoutContext {
    /// Number of items in the source, zero without a source.
    fn item_count(&self) -> usize;

    /// The data item at `index`.
    fn get_item_at(&self, index: usize) -> RepeaterResult<ItemValue>;

    /// Per-repeater storage owned by the layout.
    fn layout_state(&mut self) -> &mut Option<Box<dyn Any + Send + Sync>>;
}

/// Context handed to virtualizing layouts.
pub trait VirtualizingLayoutContext: LayoutContext {
    /// The window that should be realized: the viewport extended by the cache lengths.
    fn realization_rect(&self) -> Rect;

    /// The part of the repeater currently on screen.
    fn visible_rect(&self) -> Rect;

    /// Realize the element for `index`, reusing the current one unless
    /// `options.force_create` is set.
    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> RepeaterResult<Element>;

    /// The element currently realized for `index`, without realizing anything.
    fn try_get_element_at(&self, index: usize) -> Option<Element>;

    /// Derealize `element` now.
    fn recycle_element(&mut self, element: &Element) -> RepeaterResult<()>;

    /// First and last realized index, inclusive.
    fn realized_range(&self) -> Option<(usize, usize)>;

    fn layout_origin(&self) -> Point;

    fn set_layout_origin(&mut self, origin: Point);
}

/// Context handed to non-virtualizing layouts. Every item is realized.
pub trait NonVirtualizingLayoutContext: LayoutContext {
    /// All realized elements in index order.
    fn children(&self) -> Vec<Element>;
}

/// Take the layout's state out of `context`, or a fresh one if it holds
/// nothing or something of another type.
pub fn take_layout_state<S, C>(context: &mut C) -> S
where
    S: Any + Send + Sync + Default,
    C: LayoutContext + ?Sized,
{
    match context.layout_state().take().map(|state| state.downcast::<S>()) {
        Some(Ok(state)) => *state,
        _ => S::default(),
    }
}

/// Put the layout's state back into `context`.
pub fn store_layout_state<S, C>(context: &mut C, state: S)
where
    S: Any + Send + Sync,
    C: LayoutContext + ?Sized,
{
    *context.layout_state() = Some(Box::new(state));
}
