//! Pushing selection state into realized elements.
//!
//! Visuals never subscribe to the model themselves. Whoever owns both the
//! model and the repeater connects once to
//! [`SelectionModel::selection_changed`] and calls [`apply_selection_change`],
//! which finds the affected elements through the repeater's index lookup.
//! Newly realized elements are brought up to date with [`sync_element`] from
//! the repeater's `element_prepared` notification.

use crate::element::Element;
use crate::repeater::Realizable;

use super::{IndexPath, SelectionChangedArgs, SelectionModel};

/// The accessibility event to raise for an element whose selection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionAutomationEvent {
    /// The element became the single selected item.
    ElementSelected,
    /// The element joined a multiple selection.
    ElementAddedToSelection,
    /// The element left a multiple selection.
    ElementRemovedFromSelection,
}

/// Decide which event, if any, a selection transition should raise.
///
/// Deselection in single-select mode raises nothing: the element that
/// replaced it raises `ElementSelected`.
pub fn automation_event_for(
    was_selected: bool,
    is_selected: bool,
    single_select: bool,
) -> Option<SelectionAutomationEvent> {
    match (was_selected, is_selected) {
        (false, true) if single_select => Some(SelectionAutomationEvent::ElementSelected),
        (false, true) => Some(SelectionAutomationEvent::ElementAddedToSelection),
        (true, false) if single_select => None,
        (true, false) => Some(SelectionAutomationEvent::ElementRemovedFromSelection),
        _ => None,
    }
}

/// An event for the accessibility layer to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationRequest {
    pub element: Element,
    pub path: IndexPath,
    pub event: SelectionAutomationEvent,
}

/// Set the selection state of a freshly realized element. Never requests an
/// event.
pub fn sync_element(model: &SelectionModel, element: &Element, path: &IndexPath) {
    element.set_selection_state(model.is_selected_at(path));
}

/// Update every realized element of `repeater` and collect the events to
/// raise.
pub fn refresh_realized(
    model: &SelectionModel,
    repeater: &dyn Realizable,
) -> Vec<AutomationRequest> {
    update(model, repeater.realized_paths())
}

/// Update the realized elements affected by `args`: the changed paths and
/// their ancestors, whose indeterminate state may have flipped.
pub fn apply_selection_change(
    model: &SelectionModel,
    repeater: &dyn Realizable,
    args: &SelectionChangedArgs,
) -> Vec<AutomationRequest> {
    let changed: Vec<&IndexPath> = args.selected.iter().chain(&args.deselected).collect();
    let affected = repeater
        .realized_paths()
        .into_iter()
        .filter(|(path, _)| {
            changed
                .iter()
                .any(|changed| *changed == path || path.is_ancestor_of(changed))
        })
        .collect();
    update(model, affected)
}

fn update(model: &SelectionModel, elements: Vec<(IndexPath, Element)>) -> Vec<AutomationRequest> {
    let single_select = model.is_single_select();
    let mut requests = Vec::new();
    for (path, element) in elements {
        let previous = element.selection_state();
        let state = model.is_selected_at(&path);
        if !element.set_selection_state(state) {
            continue;
        }
        // First sync after realization is not a user-visible transition.
        let Some(previous) = previous else {
            continue;
        };
        let event = automation_event_for(previous == Some(true), state == Some(true), single_select);
        if let Some(event) = event {
            tracing::trace!(target: "horizon_repeater::selection", %path, ?event, "automation event requested");
            requests.push(AutomationRequest {
                element,
                path,
                event,
            });
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::EmptyVisual;
    use crate::error::RepeaterResult;

    /// Realized elements at fixed top-level indices.
    struct FakeRealized(Vec<(usize, Element)>);

    impl FakeRealized {
        fn new(indices: &[usize]) -> Self {
            Self(indices.iter().map(|&i| (i, Element::new(EmptyVisual))).collect())
        }
    }

    impl Realizable for FakeRealized {
        fn try_get_element(&self, index: usize) -> Option<Element> {
            self.0.iter().find(|(i, _)| *i == index).map(|(_, e)| e.clone())
        }

        fn get_element_index(&self, element: &Element) -> Option<usize> {
            self.0.iter().find(|(_, e)| e == element).map(|(i, _)| *i)
        }

        fn get_or_create_element(&mut self, index: usize) -> RepeaterResult<Element> {
            let element = Element::new(EmptyVisual);
            self.0.push((index, element.clone()));
            Ok(element)
        }

        fn index_path_of(&self, element: &Element) -> Option<IndexPath> {
            self.get_element_index(element).map(IndexPath::from_index)
        }

        fn realized_paths(&self) -> Vec<(IndexPath, Element)> {
            self.0
                .iter()
                .map(|(i, e)| (IndexPath::from_index(*i), e.clone()))
                .collect()
        }
    }

    #[test]
    fn test_automation_event_table() {
        use SelectionAutomationEvent::*;
        assert_eq!(automation_event_for(false, true, true), Some(ElementSelected));
        assert_eq!(automation_event_for(false, true, false), Some(ElementAddedToSelection));
        assert_eq!(automation_event_for(true, false, true), None);
        assert_eq!(automation_event_for(true, false, false), Some(ElementRemovedFromSelection));
        assert_eq!(automation_event_for(true, true, false), None);
        assert_eq!(automation_event_for(false, false, true), None);
    }

    #[test]
    fn test_initial_refresh_raises_nothing() {
        let repeater = FakeRealized::new(&[0, 1, 2]);
        let mut model = SelectionModel::new();
        model.select(1);

        assert!(refresh_realized(&model, &repeater).is_empty());
        let element = repeater.try_get_element(1).unwrap();
        assert_eq!(element.selection_state(), Some(Some(true)));
    }

    #[test]
    fn test_single_select_change_raises_one_event() {
        let repeater = FakeRealized::new(&[3, 4, 5]);
        let mut model = SelectionModel::single();
        model.select(3);
        refresh_realized(&model, &repeater);

        let captured = std::sync::Arc::new(parking_lot::Mutex::new(None));
        let sink = captured.clone();
        model
            .selection_changed()
            .connect(move |args: &SelectionChangedArgs| *sink.lock() = Some(args.clone()));
        model.select(5);

        let args = captured.lock().clone().unwrap();
        let requests = apply_selection_change(&model, &repeater, &args);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, IndexPath::from_index(5));
        assert_eq!(requests[0].event, SelectionAutomationEvent::ElementSelected);
        assert_eq!(
            repeater.try_get_element(3).unwrap().selection_state(),
            Some(Some(false))
        );
    }

    #[test]
    fn test_unrealized_paths_are_skipped() {
        let repeater = FakeRealized::new(&[0]);
        let mut model = SelectionModel::new();
        refresh_realized(&model, &repeater);
        model.select(40);
        let args = SelectionChangedArgs {
            selected: vec![IndexPath::from_index(40)],
            deselected: Vec::new(),
        };
        assert!(apply_selection_change(&model, &repeater, &args).is_empty());
    }
}
