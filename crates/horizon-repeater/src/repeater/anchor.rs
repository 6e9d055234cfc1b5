//! Scroll anchoring: keeping the element the user is looking at in place
//! when the content before it changes size.

use horizon_repeater_core::Point;

use crate::element::Element;

#[derive(Debug, Default)]
pub(crate) struct AnchorTracker {
    anchor: Option<(Element, Point)>,
    correction: Option<Point>,
}

impl AnchorTracker {
    /// Remember where `element` sits before a pass.
    pub fn capture(&mut self, element: Option<Element>) {
        self.anchor = element.map(|element| {
            let origin = element.layout_slot().origin;
            (element, origin)
        });
    }

    /// Compare the anchor's position after a pass. `still_realized` reports
    /// whether the anchor survived the pass.
    pub fn resolve(&mut self, still_realized: impl Fn(&Element) -> bool) {
        let Some((element, before)) = self.anchor.take() else {
            return;
        };
        if !still_realized(&element) {
            return;
        }
        let after = element.layout_slot().origin;
        let dx = after.x - before.x;
        let dy = after.y - before.y;
        if dx != 0.0 || dy != 0.0 {
            let pending = self.correction.unwrap_or(Point::ZERO);
            self.correction = Some(Point::new(pending.x + dx, pending.y + dy));
        }
    }

    pub fn take_correction(&mut self) -> Option<Point> {
        self.correction.take()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.correction = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::EmptyVisual;
    use horizon_repeater_core::Rect;

    #[test]
    fn test_correction_accumulates_until_taken() {
        let element = Element::new(EmptyVisual);
        element.arrange(Rect::new(0.0, 100.0, 10.0, 10.0));
        let mut tracker = AnchorTracker::default();

        tracker.capture(Some(element.clone()));
        element.arrange(Rect::new(0.0, 130.0, 10.0, 10.0));
        tracker.resolve(|_| true);

        tracker.capture(Some(element.clone()));
        element.arrange(Rect::new(0.0, 140.0, 10.0, 10.0));
        tracker.resolve(|_| true);

        assert_eq!(tracker.take_correction(), Some(Point::new(0.0, 40.0)));
        assert_eq!(tracker.take_correction(), None);
    }

    #[test]
    fn test_recycled_anchor_gives_no_correction() {
        let element = Element::new(EmptyVisual);
        let mut tracker = AnchorTracker::default();
        tracker.capture(Some(element.clone()));
        element.arrange(Rect::new(0.0, 50.0, 10.0, 10.0));
        tracker.resolve(|_| false);
        assert_eq!(tracker.take_correction(), None);
    }
}
