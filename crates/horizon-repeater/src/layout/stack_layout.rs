//! Virtualizing stack layout.
//!
//! Items are placed one after another along the flow direction and stretched
//! across it. Only the items intersecting the realization window are realized;
//! the extent of everything else is estimated from the average size of the
//! items measured in the previous pass, so the estimate is exact when all
//! items are the same size.

use horizon_repeater_core::{Rect, Size};

use super::context::{
    ElementRealizationOptions, VirtualizingLayoutContext, store_layout_state, take_layout_state,
};
use super::{Orientation, VirtualizingLayout};
use crate::error::RepeaterResult;
use crate::items_source::{ChangeKind, CollectionChange};

/// A virtualizing vertical or horizontal stack.
///
/// # Example
///
/// ```
/// use horizon_repeater::layout::{Orientation, StackLayout};
///
/// let layout = StackLayout::new(Orientation::Horizontal).with_spacing(4.0);
/// assert_eq!(layout.spacing(), 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StackLayout {
    orientation: Orientation,
    spacing: f32,
}

/// Per-repeater bookkeeping kept between passes.
#[derive(Debug, Default)]
struct StackLayoutState {
    /// Bounds of the items realized by the last measure, in index order.
    bounds: Vec<(usize, Rect)>,
    /// Average extent of the items measured by the last pass.
    average: Option<f32>,
}

impl StackLayout {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            spacing: 0.0,
        }
    }

    pub fn vertical() -> Self {
        Self::new(Orientation::Vertical)
    }

    pub fn horizontal() -> Self {
        Self::new(Orientation::Horizontal)
    }

    /// Gap between adjacent items. Negative values are treated as zero.
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing.max(0.0);
        self
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }
}

impl VirtualizingLayout for StackLayout {
    fn measure(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size> {
        let mut state: StackLayoutState = take_layout_state(context);
        state.bounds.clear();

        let count = context.item_count();
        if count == 0 {
            state.average = None;
            store_layout_state(context, state);
            return Ok(Size::ZERO);
        }

        let o = self.orientation;
        let child_available = o.size(f32::INFINITY, o.minor(available));
        let (window_start, window_end) = o.major_span(context.realization_rect());

        // Without a previous pass, measure one item to seed the estimate.
        let mut seed = None;
        let average = match state.average {
            Some(average) => average,
            None => match context
                .realized_range()
                .and_then(|(first, _)| context.try_get_element_at(first))
            {
                Some(realized) => o.major(realized.measure(child_available)),
                None => {
                    let first =
                        context.get_or_create_element_at(0, ElementRealizationOptions::NONE)?;
                    let extent = o.major(first.measure(child_available));
                    seed = Some(first);
                    extent
                }
            },
        };
        let stride = average + self.spacing;
        let first_index = if stride > 0.0 {
            ((window_start.max(0.0) / stride).floor() as usize).min(count - 1)
        } else {
            0
        };
        if let Some(seed) = seed.filter(|_| first_index > 0) {
            context.recycle_element(&seed)?;
        }

        let mut position = first_index as f32 * stride;
        let mut end = position;
        let mut max_minor = 0.0f32;
        let mut measured_total = 0.0f32;
        let mut index = first_index;
        while index < count {
            let element = context.get_or_create_element_at(index, ElementRealizationOptions::NONE)?;
            let desired = element.measure(child_available);
            let major = o.major(desired);
            max_minor = max_minor.max(o.minor(desired));
            measured_total += major;
            state
                .bounds
                .push((index, o.rect(position, 0.0, major, o.minor(desired))));

            end = position + major;
            index += 1;
            if end >= window_end {
                break;
            }
            position = end + self.spacing;
        }

        let realized = state.bounds.len();
        let realized_average = measured_total / realized as f32;
        let extent = end + (count - index) as f32 * (realized_average + self.spacing);
        state.average = Some(realized_average);

        tracing::trace!(
            target: "horizon_repeater::layout",
            first = first_index,
            realized,
            extent,
            "stack measured"
        );

        store_layout_state(context, state);
        Ok(o.size(extent, max_minor))
    }

    fn arrange(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size> {
        let state: StackLayoutState = take_layout_state(context);
        let o = self.orientation;
        let origin = context.layout_origin();
        let cross = o.minor(final_size);

        for (index, bounds) in &state.bounds {
            if let Some(element) = context.try_get_element_at(*index) {
                let (start, end) = o.major_span(*bounds);
                let slot = o.rect(start, 0.0, end - start, cross);
                element.arrange(slot.offset(origin.x, origin.y));
            }
        }

        store_layout_state(context, state);
        Ok(final_size)
    }

    fn on_items_changed(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        change: &CollectionChange,
    ) {
        if change.kind == ChangeKind::Reset {
            let mut state: StackLayoutState = take_layout_state(context);
            state.average = None;
            state.bounds.clear();
            store_layout_state(context, state);
        }
    }
}
