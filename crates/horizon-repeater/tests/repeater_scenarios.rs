//! End-to-end behavior of the repeater, its factories and the selection model.

mod common;

use std::sync::Arc;

use common::{
    MockLayout, init_tracing, parity_factory, requests, selection_of, text_of, text_template,
};
use horizon_repeater::layout::{
    ElementRealizationOptions, Layout, NonVirtualStackLayout, Orientation, StackLayout,
    UniformGridLayout,
};
use horizon_repeater::selection::sync;
use horizon_repeater::{
    DataTemplate, Element, EmptyVisual, IndexPath, ItemTemplate, ItemsRepeater, ItemsSource,
    ObservableVec, Point, Rect, RecyclePoolRegistry, RepeaterConfig, RepeaterError,
    SelectionChangedArgs, SelectionModel, Size,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const AVAILABLE: Size = Size::new(100.0, 1000.0);

fn repeater_with(
    items: &Arc<ObservableVec<i32>>,
    template: impl Into<ItemTemplate>,
) -> ItemsRepeater {
    init_tracing();
    let mut repeater = ItemsRepeater::new();
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.set_item_template(template);
    repeater
}

fn assert_mapping_consistent(repeater: &ItemsRepeater, items: &ObservableVec<i32>) {
    assert!(repeater.validate_mapping());
    for (index, element) in repeater.realized_elements() {
        assert_eq!(repeater.get_element_index(&element), Some(index));
        assert_eq!(repeater.try_get_element(index).as_ref(), Some(&element));
        let expected = items.get(index).map(|value| value.to_string());
        assert_eq!(text_of(&element), expected, "element at {index} shows a stale item");
    }
}

#[test]
fn test_realizes_every_item_bound_to_its_value() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();

    for i in 0..10 {
        let element = repeater.try_get_element(i).unwrap();
        assert_eq!(text_of(&element), Some(i.to_string()));
    }
    assert!(repeater.try_get_element(20).is_none());
    assert_eq!(repeater.desired_size(), Size::new(100.0, 100.0));
}

#[test]
fn test_recycling_is_keyed_by_template() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let window = requests([0, 1]);
    let mut repeater = repeater_with(&items, ItemTemplate::factory(parity_factory()));
    repeater.set_layout(Layout::virtualizing(MockLayout::requesting(window)));
    repeater.update_layout(AVAILABLE).unwrap();

    let even = repeater.try_get_element(0).unwrap();
    let odd = repeater.try_get_element(1).unwrap();
    repeater.recycle_element(&even).unwrap();
    repeater.recycle_element(&odd).unwrap();

    assert_eq!(repeater.get_or_create_element(2).unwrap(), even);
    assert_eq!(repeater.get_or_create_element(3).unwrap(), odd);
    assert_eq!(text_of(&even).as_deref(), Some("2"));
    assert_eq!(text_of(&odd).as_deref(), Some("3"));
}

#[test]
fn test_single_select_notifies_once_per_change() {
    let mut model = SelectionModel::single();
    let notifications = Arc::new(Mutex::new(0usize));
    let counter = notifications.clone();
    model
        .selection_changed()
        .connect(move |_: &SelectionChangedArgs| *counter.lock() += 1);

    model.select(3);
    *notifications.lock() = 0;
    model.select(5);

    assert!(!model.is_selected(3));
    assert!(model.is_selected(5));
    assert_eq!(*notifications.lock(), 1);

    model.select(5);
    assert_eq!(*notifications.lock(), 1);
    assert_eq!(model.selected_count(), 1);
}

#[test]
fn test_hierarchical_selection_reports_partial_parent() {
    let mut model = SelectionModel::new();
    model.select_at(IndexPath::from([2, 1]));

    assert_eq!(model.is_selected_at(&IndexPath::from([2])), None);
    assert_eq!(model.is_selected_at(&IndexPath::from([2, 1])), Some(true));
    assert_eq!(model.is_selected_at(&IndexPath::from([2, 0])), Some(false));
}

#[test]
fn test_removing_focused_item_recycles_only_its_element() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();

    let before: Vec<Element> = (0..10).map(|i| repeater.try_get_element(i).unwrap()).collect();
    let focused = before[4].clone();
    repeater.set_focused_element(Some(&focused)).unwrap();

    let lost = Arc::new(Mutex::new(Vec::new()));
    let sink = lost.clone();
    repeater
        .signals()
        .focus_lost
        .connect(move |element: &Element| sink.lock().push(element.clone()));

    items.remove(4);
    repeater.update_layout(AVAILABLE).unwrap();

    assert_eq!(repeater.get_element_index(&focused), None);
    assert_eq!(*lost.lock(), vec![focused.clone()]);
    assert_eq!(repeater.focused_element(), None);
    for old in 5..10 {
        assert_eq!(repeater.get_element_index(&before[old]), Some(old - 1));
        assert_eq!(repeater.try_get_element(old - 1).as_ref(), Some(&before[old]));
    }
    assert!(repeater.try_get_element(9).is_none());
    assert_mapping_consistent(&repeater, &items);
}

#[test]
fn test_mapping_survives_random_mutations() {
    let items = Arc::new(ObservableVec::new((0..40).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut next_value = 1000;

    for _ in 0..200 {
        match rng.gen_range(0..6) {
            0 | 1 => {
                let index = rng.gen_range(0..=items.len());
                items.insert(index, next_value);
                next_value += 1;
            }
            2 | 3 => {
                if !items.is_empty() {
                    items.remove(rng.gen_range(0..items.len()));
                }
            }
            4 => {
                let offset = rng.gen_range(0..=items.len() * 10) as f32;
                repeater.set_viewport(Rect::new(0.0, offset, 100.0, 100.0));
            }
            _ => {
                let count: i32 = rng.gen_range(0..50);
                items.set_items((next_value..next_value + count).collect());
                next_value += count;
            }
        }
        repeater.update_layout(Size::new(100.0, 100.0)).unwrap();
        assert_mapping_consistent(&repeater, &items);
    }
}

#[test]
fn test_keyed_reset_keeps_surviving_elements() {
    init_tracing();
    let items = Arc::new(ObservableVec::with_keys((0..5).collect(), |value: &i32| {
        value.to_string()
    }));
    let mut repeater = ItemsRepeater::new();
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.set_item_template(text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();
    let three = repeater.try_get_element(3).unwrap();
    let one = repeater.try_get_element(1).unwrap();

    items.set_items(vec![3, 7, 0]);
    repeater.update_layout(AVAILABLE).unwrap();

    assert_eq!(repeater.get_element_index(&three), Some(0));
    assert_eq!(repeater.get_element_index(&one), None);
    assert_eq!(repeater.unique_id_of(&three).as_deref(), Some("3"));
    assert_mapping_consistent(&repeater, &items);
}

#[test]
fn test_keyed_reset_rebinds_kept_elements() {
    init_tracing();
    fn rows(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }
    let key = |row: &String| row.split(':').next().unwrap_or_default().to_string();
    let items = Arc::new(ObservableVec::with_keys(rows(&["1:a", "2:b"]), key));
    let mut repeater = ItemsRepeater::new();
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.set_item_template(text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();
    let first = repeater.try_get_element(0).unwrap();

    let prepared = Arc::new(Mutex::new(Vec::new()));
    let sink = prepared.clone();
    repeater
        .signals()
        .element_prepared
        .connect(move |(element, index): &(Element, usize)| {
            sink.lock().push((element.clone(), *index));
        });

    items.set_items(rows(&["2:b", "1:a-renamed"]));
    repeater.update_layout(AVAILABLE).unwrap();

    assert_eq!(repeater.get_element_index(&first), Some(1));
    assert_eq!(text_of(&first).as_deref(), Some("1:a-renamed"));
    assert_eq!(text_of(&repeater.try_get_element(0).unwrap()).as_deref(), Some("2:b"));
    assert!(prepared.lock().contains(&(first.clone(), 1)));
    assert!(repeater.validate_mapping());
}

#[test]
fn test_move_keeps_the_element() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();
    let moved = repeater.try_get_element(1).unwrap();
    let shifted = repeater.try_get_element(3).unwrap();

    assert!(items.move_item(1, 5));
    repeater.update_layout(AVAILABLE).unwrap();

    assert_eq!(repeater.get_element_index(&moved), Some(5));
    assert_eq!(repeater.get_element_index(&shifted), Some(2));
    assert_eq!(text_of(&moved).as_deref(), Some("1"));
    assert_eq!(repeater.realized_count(), 10);
    assert_mapping_consistent(&repeater, &items);
}

#[test]
fn test_replace_rebinds_the_slot() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();
    let neighbour = repeater.try_get_element(4).unwrap();

    items.replace(3, 99);
    repeater.update_layout(AVAILABLE).unwrap();

    let replaced = repeater.try_get_element(3).unwrap();
    assert_eq!(text_of(&replaced).as_deref(), Some("99"));
    assert_eq!(repeater.get_element_index(&neighbour), Some(4));
    assert_eq!(repeater.realized_count(), 10);
    assert_mapping_consistent(&repeater, &items);
}

#[test]
fn test_forced_duplicate_leaves_mapping_intact() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let window = requests([0, 1, 2]);
    window.lock().push((1, ElementRealizationOptions::FORCE_CREATE));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.set_layout(Layout::virtualizing(MockLayout::requesting(window.clone())));

    let prepared = Arc::new(Mutex::new(Vec::new()));
    let sink = prepared.clone();
    repeater
        .signals()
        .element_prepared
        .connect(move |(element, _): &(Element, usize)| sink.lock().push(element.clone()));
    repeater.update_layout(AVAILABLE).unwrap();

    let original = prepared.lock()[1].clone();
    let duplicate = prepared.lock()[3].clone();
    assert_ne!(original, duplicate);
    assert_eq!(repeater.realized_count(), 4);
    assert_eq!(repeater.try_get_element(1), Some(original.clone()));
    assert_eq!(repeater.get_element_index(&duplicate), Some(1));
    assert_eq!(text_of(&duplicate).as_deref(), Some("1"));
    assert!(repeater.validate_mapping());

    *window.lock() = requests([0, 1, 2]).lock().clone();
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.realized_count(), 3);
    assert_eq!(repeater.get_element_index(&duplicate), None);
    assert_eq!(repeater.try_get_element(1), Some(original));
    assert_mapping_consistent(&repeater, &items);
}

#[test]
fn test_shared_pool_moves_elements_between_repeaters() {
    init_tracing();
    let registry = Arc::new(RecyclePoolRegistry::new());
    let template = Arc::new(text_template(10.0));
    let repeater_over = |items: &Arc<ObservableVec<i32>>, window| {
        let mut repeater =
            ItemsRepeater::with_config(RepeaterConfig::new().shared_pools(registry.clone()));
        repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
        repeater.set_item_template(template.clone());
        repeater.set_layout(Layout::virtualizing(MockLayout::requesting(window)));
        repeater
    };

    let left_items = Arc::new(ObservableVec::new((0..5).collect()));
    let right_items = Arc::new(ObservableVec::new((100..105).collect()));
    let mut left = repeater_over(&left_items, requests([0, 1, 2]));
    let mut right = repeater_over(&right_items, requests([0]));

    left.update_layout(AVAILABLE).unwrap();
    let handed_over = left.try_get_element(2).unwrap();
    left.recycle_element(&handed_over).unwrap();

    right.update_layout(AVAILABLE).unwrap();
    assert_eq!(right.try_get_element(0), Some(handed_over.clone()));
    assert_eq!(text_of(&handed_over).as_deref(), Some("100"));
    assert_eq!(handed_over.owner(), Some(right.id()));
    assert!(right.validate_mapping());
}

#[test]
fn test_unpin_keeps_suppressed_auto_recycle() {
    let items = Arc::new(ObservableVec::new((0..20).collect()));
    let window = requests([0]);
    window
        .lock()
        .push((1, ElementRealizationOptions::SUPPRESS_AUTO_RECYCLE));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.set_layout(Layout::virtualizing(MockLayout::requesting(window.clone())));
    repeater.update_layout(AVAILABLE).unwrap();
    let kept = repeater.try_get_element(1).unwrap();

    repeater.pin_element(&kept).unwrap();
    repeater.unpin_element(&kept).unwrap();
    assert!(repeater.is_pinned(&kept));

    *window.lock() = requests([5]).lock().clone();
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.try_get_element(1), Some(kept));
}

#[test]
fn test_suppressed_auto_recycle_outlives_the_window() {
    let items = Arc::new(ObservableVec::new((0..20).collect()));
    let window = requests([0, 2]);
    window
        .lock()
        .push((1, ElementRealizationOptions::SUPPRESS_AUTO_RECYCLE));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.set_layout(Layout::virtualizing(MockLayout::requesting(window.clone())));
    repeater.update_layout(AVAILABLE).unwrap();
    let kept = repeater.try_get_element(1).unwrap();

    *window.lock() = requests(5..8).lock().clone();
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.try_get_element(1), Some(kept.clone()));
    assert!(repeater.try_get_element(0).is_none());
    assert_eq!(repeater.realized_range(), Some((1, 7)));

    repeater.recycle_element(&kept).unwrap();
    repeater.update_layout(AVAILABLE).unwrap();
    assert!(repeater.try_get_element(1).is_none());
    assert_eq!(repeater.realized_range(), Some((5, 7)));
}

#[test]
fn test_template_swap_keeps_old_children_for_one_pass() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.child_count(), 10);

    repeater.set_item_template(text_template(20.0));
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.child_count(), 20);

    repeater.invalidate_measure();
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.child_count(), 10);
    let first = repeater.try_get_element(0).unwrap();
    assert_eq!(first.desired_size().height, 20.0);
}

#[test]
fn test_selector_without_template_fails_the_pass() {
    let items = Arc::new(ObservableVec::new((0..3).collect()));
    let selector = |_item: &horizon_repeater::ItemValue, index: usize| {
        (index != 1).then(|| Arc::new(text_template(10.0)))
    };
    let mut repeater = repeater_with(&items, ItemTemplate::selector(selector));

    let err = repeater.update_layout(AVAILABLE).unwrap_err();
    assert_eq!(err, RepeaterError::NullTemplate { index: 1 });
    assert!(err.to_string().starts_with("Null encountered as data template"));
    assert!(repeater.needs_measure());
}

#[test]
fn test_no_items_source() {
    let mut repeater = ItemsRepeater::new();
    let err = repeater.get_or_create_element(0).unwrap_err();
    assert_eq!(err.to_string(), "ItemsSource doesn't have a value");
    assert_eq!(repeater.update_layout(AVAILABLE).unwrap(), AVAILABLE);
}

#[test]
fn test_clearing_the_source_detaches_children() {
    let items = Arc::new(ObservableVec::new((0..5).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.update_layout(AVAILABLE).unwrap();

    repeater.set_items_source(None);
    assert_eq!(repeater.realized_count(), 0);
    assert_eq!(repeater.child_count(), 0);
    assert!(repeater.try_get_element(0).is_none());
}

#[test]
fn test_anchor_correction_after_insert_above() {
    let items = Arc::new(ObservableVec::new((0..100).collect()));
    let mut repeater = ItemsRepeater::with_config(RepeaterConfig::new().no_cache());
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.set_item_template(text_template(50.0));
    repeater.set_viewport(Rect::new(0.0, 200.0, 100.0, 100.0));
    repeater.update_layout(Size::new(100.0, 100.0)).unwrap();

    let anchor = repeater.current_anchor().unwrap();
    assert_eq!(repeater.get_element_index(&anchor), Some(4));

    items.insert(0, -1);
    repeater.update_layout(Size::new(100.0, 100.0)).unwrap();
    assert_eq!(repeater.get_element_index(&anchor), Some(5));
    assert_eq!(repeater.take_anchor_correction(), Some(Point::new(0.0, 50.0)));
    assert_eq!(repeater.take_anchor_correction(), None);
}

#[test]
fn test_element_items_are_used_directly() {
    let own: Vec<Element> = (0..3).map(|_| Element::new(common::TextVisual::new(10.0))).collect();
    let items = Arc::new(ObservableVec::new(own.clone()));
    let mut repeater = ItemsRepeater::new();
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.update_layout(AVAILABLE).unwrap();

    assert_eq!(repeater.try_get_element(2), Some(own[2].clone()));

    items.remove(2);
    repeater.update_layout(AVAILABLE).unwrap();
    assert_eq!(repeater.child_count(), 2);
    assert_eq!(own[2].owner(), None);
}

#[test]
fn test_non_virtualizing_layout_realizes_everything() {
    let items = Arc::new(ObservableVec::new((0..30).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.set_layout(Layout::non_virtualizing(
        NonVirtualStackLayout::new(Orientation::Vertical).with_spacing(2.0),
    ));
    repeater.set_viewport(Rect::new(0.0, 0.0, 100.0, 20.0));

    let desired = repeater.update_layout(Size::new(100.0, f32::INFINITY)).unwrap();
    assert_eq!(repeater.realized_count(), 30);
    assert_eq!(desired.height, 30.0 * 10.0 + 29.0 * 2.0);

    repeater.set_viewport(Rect::new(0.0, 150.0, 100.0, 20.0));
    assert!(!repeater.needs_measure());
}

#[test]
fn test_grid_realizes_whole_rows() {
    let items = Arc::new(ObservableVec::new((0..100).collect()));
    let mut repeater = ItemsRepeater::with_config(RepeaterConfig::new().no_cache());
    repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
    repeater.set_item_template(DataTemplate::new(|| EmptyVisual));
    repeater.set_layout(Layout::virtualizing(
        UniformGridLayout::new()
            .with_min_item_size(25.0, 10.0)
            .with_maximum_rows_or_columns(4),
    ));
    repeater.set_viewport(Rect::new(0.0, 0.0, 100.0, 30.0));
    let desired = repeater.measure(Size::new(100.0, 30.0)).unwrap();
    repeater.arrange(Size::new(100.0, 30.0)).unwrap();

    assert_eq!(repeater.realized_range(), Some((0, 11)));
    assert_eq!(desired, Size::new(100.0, 250.0));
    assert!(repeater.validate_mapping());
    let last = repeater.try_get_element(11).unwrap();
    assert_eq!(last.layout_slot(), Rect::new(75.0, 20.0, 25.0, 10.0));
}

#[test]
fn test_selection_sync_follows_realization() {
    let items = Arc::new(ObservableVec::new((0..10).collect()));
    let mut repeater = repeater_with(&items, text_template(10.0));
    repeater.set_layout(Layout::virtualizing(StackLayout::vertical()));
    repeater.update_layout(AVAILABLE).unwrap();

    let mut model = SelectionModel::new();
    model.select(2);
    assert!(sync::refresh_realized(&model, &repeater).is_empty());
    let element = repeater.try_get_element(2).unwrap();
    assert_eq!(selection_of(&element), Some(Some(true)));

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    model
        .selection_changed()
        .connect(move |args: &SelectionChangedArgs| sink.lock().push(args.clone()));
    model.select(4);

    let args = captured.lock()[0].clone();
    let requests = sync::apply_selection_change(&model, &repeater, &args);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].event, sync::SelectionAutomationEvent::ElementAddedToSelection);
    assert_eq!(repeater.get_element_index(&requests[0].element), Some(4));
}

#[test]
fn test_selection_shifts_with_the_data() {
    let mut model = SelectionModel::new();
    model.select(3);
    let items = ObservableVec::new((0..10).collect::<Vec<i32>>());
    let change = Arc::new(Mutex::new(None));
    let sink = change.clone();
    items
        .collection_changed
        .connect(move |c| *sink.lock() = Some(*c));

    items.insert(1, 99);
    let inserted = change.lock().take().unwrap();
    model.on_items_changed(&IndexPath::root(), &inserted);
    assert_eq!(model.selected_indices(), vec![4]);
}
