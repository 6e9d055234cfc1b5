//! In-memory layout contexts for exercising layouts without a repeater.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use horizon_repeater_core::{Point, Rect, Size};

use super::context::{
    ElementRealizationOptions, LayoutContext, NonVirtualizingLayoutContext,
    VirtualizingLayoutContext,
};
use crate::element::{Element, Measurable, SelectionAware, Visual};
use crate::error::{RepeaterError, RepeaterResult};
use crate::items_source::ItemValue;

/// A visual that always wants the same size.
pub(crate) struct FixedVisual(pub Size);

impl Measurable for FixedVisual {
    fn measure(&mut self, _available: Size) -> Size {
        self.0
    }
}

impl SelectionAware for FixedVisual {}
impl Visual for FixedVisual {}

pub(crate) struct FakeContext {
    pub sizes: Vec<Size>,
    pub window: Rect,
    pub realized: BTreeMap<usize, Element>,
    pub created: usize,
    pub origin: Point,
    state: Option<Box<dyn Any + Send + Sync>>,
}

impl FakeContext {
    pub fn new(sizes: Vec<Size>, window: Rect) -> Self {
        Self {
            sizes,
            window,
            realized: BTreeMap::new(),
            created: 0,
            origin: Point::ZERO,
            state: None,
        }
    }

    pub fn uniform(count: usize, size: Size, window: Rect) -> Self {
        Self::new(vec![size; count], window)
    }

    pub fn realized_indices(&self) -> Vec<usize> {
        self.realized.keys().copied().collect()
    }

    /// Realize everything, as a repeater does for non-virtualizing layouts.
    pub fn realize_all(&mut self) {
        for index in 0..self.sizes.len() {
            let _ = self.get_or_create_element_at(index, ElementRealizationOptions::NONE);
        }
    }
}

impl LayoutContext for FakeContext {
    fn item_count(&self) -> usize {
        self.sizes.len()
    }

    fn get_item_at(&self, index: usize) -> RepeaterResult<ItemValue> {
        self.sizes
            .get(index)
            .map(|_| Arc::new(index) as ItemValue)
            .ok_or(RepeaterError::IndexOutOfRange {
                index,
                count: self.sizes.len(),
            })
    }

    fn layout_state(&mut self) -> &mut Option<Box<dyn Any + Send + Sync>> {
        &mut self.state
    }
}

impl VirtualizingLayoutContext for FakeContext {
    fn realization_rect(&self) -> Rect {
        self.window
    }

    fn visible_rect(&self) -> Rect {
        self.window
    }

    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> RepeaterResult<Element> {
        let size = *self.sizes.get(index).ok_or(RepeaterError::IndexOutOfRange {
            index,
            count: self.sizes.len(),
        })?;
        if !options.force_create {
            if let Some(element) = self.realized.get(&index) {
                return Ok(element.clone());
            }
        }
        self.created += 1;
        let element = Element::new(FixedVisual(size));
        self.realized.insert(index, element.clone());
        Ok(element)
    }

    fn try_get_element_at(&self, index: usize) -> Option<Element> {
        self.realized.get(&index).cloned()
    }

    fn recycle_element(&mut self, element: &Element) -> RepeaterResult<()> {
        let before = self.realized.len();
        self.realized.retain(|_, realized| realized != element);
        if self.realized.len() == before {
            return Err(RepeaterError::ElementNotOwned);
        }
        Ok(())
    }

    fn realized_range(&self) -> Option<(usize, usize)> {
        let first = *self.realized.keys().next()?;
        let last = *self.realized.keys().next_back()?;
        Some((first, last))
    }

    fn layout_origin(&self) -> Point {
        self.origin
    }

    fn set_layout_origin(&mut self, origin: Point) {
        self.origin = origin;
    }
}

impl NonVirtualizingLayoutContext for FakeContext {
    fn children(&self) -> Vec<Element> {
        self.realized.values().cloned().collect()
    }
}
