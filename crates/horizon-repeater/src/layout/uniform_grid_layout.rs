//! Virtualizing grid of equally sized cells.
//!
//! The cell size is the larger of the configured minimum and the desired size
//! of the first item. Cells fill a line across the flow direction (a row for
//! [`Orientation::Vertical`], a column for [`Orientation::Horizontal`]) and
//! lines stack along it. Because every cell is the same size the extent is
//! exact and the realized range follows directly from the window.

use horizon_repeater_core::{Rect, Size};

use super::context::{
    ElementRealizationOptions, VirtualizingLayoutContext, store_layout_state, take_layout_state,
};
use super::{Orientation, VirtualizingLayout};
use crate::error::RepeaterResult;
use crate::items_source::{ChangeKind, CollectionChange};

/// A virtualizing grid layout.
///
/// # Example
///
/// ```
/// use horizon_repeater::layout::UniformGridLayout;
///
/// let grid = UniformGridLayout::new()
///     .with_min_item_size(64.0, 64.0)
///     .with_spacing(8.0, 8.0)
///     .with_maximum_rows_or_columns(4);
/// assert_eq!(grid.maximum_rows_or_columns(), Some(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformGridLayout {
    orientation: Orientation,
    min_item_width: f32,
    min_item_height: f32,
    min_row_spacing: f32,
    min_column_spacing: f32,
    maximum_rows_or_columns: Option<usize>,
}

#[derive(Debug, Default)]
struct GridState {
    item_size: Option<Size>,
    per_line: usize,
    /// Half-open index range realized by the last measure.
    realized: (usize, usize),
}

impl UniformGridLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_min_item_size(mut self, width: f32, height: f32) -> Self {
        self.min_item_width = width.max(0.0);
        self.min_item_height = height.max(0.0);
        self
    }

    pub fn with_spacing(mut self, row_spacing: f32, column_spacing: f32) -> Self {
        self.min_row_spacing = row_spacing.max(0.0);
        self.min_column_spacing = column_spacing.max(0.0);
        self
    }

    /// Cap on cells per line. Zero is treated as one.
    pub fn with_maximum_rows_or_columns(mut self, maximum: usize) -> Self {
        self.maximum_rows_or_columns = Some(maximum.max(1));
        self
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn maximum_rows_or_columns(&self) -> Option<usize> {
        self.maximum_rows_or_columns
    }

    /// Spacing between lines and between cells within a line.
    fn spacings(&self) -> (f32, f32) {
        match self.orientation {
            Orientation::Vertical => (self.min_row_spacing, self.min_column_spacing),
            Orientation::Horizontal => (self.min_column_spacing, self.min_row_spacing),
        }
    }

    fn cells_per_line(&self, available_minor: f32, item_minor: f32, cell_spacing: f32, count: usize) -> usize {
        let fit = if available_minor.is_finite() && item_minor + cell_spacing > 0.0 {
            ((available_minor + cell_spacing) / (item_minor + cell_spacing)).floor() as usize
        } else {
            count
        };
        let capped = match self.maximum_rows_or_columns {
            Some(maximum) => fit.min(maximum),
            None => fit,
        };
        capped.clamp(1, count.max(1))
    }
}

impl VirtualizingLayout for UniformGridLayout {
    fn measure(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size> {
        let mut state: GridState = take_layout_state(context);
        let count = context.item_count();
        if count == 0 {
            state.realized = (0, 0);
            store_layout_state(context, state);
            return Ok(Size::ZERO);
        }

        let o = self.orientation;
        let item_size = match state.item_size {
            Some(size) => size,
            None => {
                let first = context.get_or_create_element_at(0, ElementRealizationOptions::NONE)?;
                let desired = first.measure(available);
                Size::new(
                    desired.width.max(self.min_item_width),
                    desired.height.max(self.min_item_height),
                )
            }
        };
        let (line_spacing, cell_spacing) = self.spacings();
        let item_major = o.major(item_size);
        let item_minor = o.minor(item_size);

        let per_line = self.cells_per_line(o.minor(available), item_minor, cell_spacing, count);
        let lines = count.div_ceil(per_line);
        let line_stride = item_major + line_spacing;

        let (window_start, window_end) = o.major_span(context.realization_rect());
        let (first_line, last_line) = if line_stride > 0.0 {
            let first = ((window_start.max(0.0) / line_stride).floor() as usize).min(lines - 1);
            let last = ((window_end / line_stride).ceil() as usize)
                .saturating_sub(1)
                .clamp(first, lines - 1);
            (first, last)
        } else {
            (0, lines - 1)
        };

        let start = first_line * per_line;
        let end = ((last_line + 1) * per_line).min(count);
        for index in start..end {
            let element = context.get_or_create_element_at(index, ElementRealizationOptions::NONE)?;
            element.measure(item_size);
        }

        tracing::trace!(
            target: "horizon_repeater::layout",
            per_line,
            first = start,
            last = end,
            "grid measured"
        );

        state.item_size = Some(item_size);
        state.per_line = per_line;
        state.realized = (start, end);
        store_layout_state(context, state);

        let extent_major = lines as f32 * item_major + (lines - 1) as f32 * line_spacing;
        let extent_minor = per_line as f32 * item_minor + (per_line - 1) as f32 * cell_spacing;
        Ok(o.size(extent_major, extent_minor))
    }

    fn arrange(
        &self,
        context: &mut dyn VirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size> {
        let state: GridState = take_layout_state(context);
        if let Some(item_size) = state.item_size {
            let o = self.orientation;
            let (line_spacing, cell_spacing) = self.spacings();
            let item_major = o.major(item_size);
            let item_minor = o.minor(item_size);
            let origin = context.layout_origin();
            let per_line = state.per_line.max(1);

            for index in state.realized.0..state.realized.1 {
                let Some(element) = context.try_get_element_at(index) else {
                    continue;
                };
                let line = (index / per_line) as f32;
                let cell = (index % per_line) as f32;
                let bounds: Rect = o.rect(
                    line * (item_major + line_spacing),
                    cell * (item_minor + cell_spacing),
                    item_major,
                    item_minor,
                );
                element.arrange(bounds.offset(origin.x, origin.y));
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
            store_layout_state(context, GridState::default());
        }
    }
}
