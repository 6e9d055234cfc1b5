//! A stack that positions every item.

use horizon_repeater_core::{Rect, Size};

use super::context::NonVirtualizingLayoutContext;
use super::{NonVirtualizingLayout, Orientation};
use crate::error::RepeaterResult;

/// Non-virtualizing stack. Suitable for short lists where realizing every
/// item is cheaper than estimating.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NonVirtualStackLayout {
    orientation: Orientation,
    spacing: f32,
}

impl NonVirtualStackLayout {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            spacing: 0.0,
        }
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing.max(0.0);
        self
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

impl NonVirtualizingLayout for NonVirtualStackLayout {
    fn measure(
        &self,
        context: &mut dyn NonVirtualizingLayoutContext,
        available: Size,
    ) -> RepeaterResult<Size> {
        let o = self.orientation;
        let child_available = o.size(f32::INFINITY, o.minor(available));
        let children = context.children();

        let mut major = 0.0f32;
        let mut minor = 0.0f32;
        for child in &children {
            let desired = child.measure(child_available);
            major += o.major(desired);
            minor = minor.max(o.minor(desired));
        }
        if children.len() > 1 {
            major += (children.len() - 1) as f32 * self.spacing;
        }
        Ok(o.size(major, minor))
    }

    fn arrange(
        &self,
        context: &mut dyn NonVirtualizingLayoutContext,
        final_size: Size,
    ) -> RepeaterResult<Size> {
        let o = self.orientation;
        let cross = o.minor(final_size);
        let mut position = 0.0f32;
        for child in context.children() {
            let length = o.major(child.desired_size());
            let bounds: Rect = o.rect(position, 0.0, length, cross);
            child.arrange(bounds);
            position += length + self.spacing;
        }
        Ok(final_size)
    }
}
