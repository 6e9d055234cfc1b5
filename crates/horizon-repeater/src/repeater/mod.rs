//! The item repeater.
//!
//! [`ItemsRepeater`] binds an [`ItemsSource`] to a [`Layout`] and an
//! [`ItemTemplate`]. During a measure pass the layout asks for elements by
//! index; the repeater realizes them through its element factory, tracks the
//! index to element mapping, and at the end of the pass hands every element
//! the layout did not ask for (and that is not pinned) back to the factory.
//!
//! # Realization Lifecycle
//!
//! ```text
//! Unrealized -> Realized -> (not requested, unpinned) -> recycled -> Unrealized
//! Unrealized -> Realized + pinned -> (explicit recycle) -> Unrealized
//! ```
//!
//! Recycled elements stay attached as children, parked at off-screen bounds,
//! so they can be reused without being re-parented.
//!
//! # Collection Changes
//!
//! Change notifications are queued by the source subscription and applied in
//! order at the start of the next measure pass (or by
//! [`get_or_create_element`](ItemsRepeater::get_or_create_element) and
//! [`process_pending_changes`](ItemsRepeater::process_pending_changes)).
//! Elements whose items were removed or replaced are recycled; the rest are
//! shifted to their new indices without being recreated.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_repeater::{ItemsRepeater, ItemsSource, ObservableVec, Size};
//!
//! let items = Arc::new(ObservableVec::new((0..100).collect::<Vec<i32>>()));
//! let mut repeater = ItemsRepeater::new();
//! repeater.set_items_source(Some(items.clone() as Arc<dyn ItemsSource>));
//! repeater.update_layout(Size::new(200.0, 400.0)).unwrap();
//!
//! let first = repeater.try_get_element(0).unwrap();
//! assert_eq!(repeater.get_element_index(&first), Some(0));
//!
//! items.insert(0, -1);
//! repeater.update_layout(Size::new(200.0, 400.0)).unwrap();
//! assert_eq!(repeater.get_element_index(&first), Some(1));
//! ```

mod anchor;
mod realized;

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use horizon_repeater_core::{Observable, PerfSpan, Point, Rect, Signal, Size, ThreadAffinity};
use parking_lot::Mutex;

use crate::config::RepeaterConfig;
use crate::element::{Element, ElementId};
use crate::element_factory::{
    ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, ItemTemplate,
};
use crate::error::{RepeaterError, RepeaterResult};
use crate::items_source::{ChangeKind, CollectionChange, ItemValue, ItemsSource, ItemsSourceView};
use crate::layout::{
    ElementRealizationOptions, Layout, LayoutContext, NonVirtualizingLayoutContext,
    VirtualizingLayoutContext,
};
use crate::selection::IndexPath;

use anchor::AnchorTracker;
use realized::{RealizedElements, RealizedInfo};

/// Where recycled elements are parked.
const CLEARED_BOUNDS: Rect = Rect::new(-10000.0, -10000.0, 0.0, 0.0);

static NEXT_REPEATER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an [`ItemsRepeater`], used as the owner of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepeaterId(u64);

impl RepeaterId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REPEATER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Notifications raised by a repeater.
#[derive(Default)]
pub struct RepeaterSignals {
    /// An element was realized for an index and is about to be measured.
    pub element_prepared: Signal<(Element, usize)>,
    /// An element is being derealized.
    pub element_clearing: Signal<Element>,
    /// A realized element moved to a new index: `(element, old, new)`.
    pub element_index_changed: Signal<(Element, usize, usize)>,
    /// The focused element was derealized.
    pub focus_lost: Signal<Element>,
}

/// Index based access to realized elements, for components that sit on top
/// of a repeater without owning it (selection sync, automation).
pub trait Realizable {
    fn try_get_element(&self, index: usize) -> Option<Element>;

    fn get_element_index(&self, element: &Element) -> Option<usize>;

    fn get_or_create_element(&mut self, index: usize) -> RepeaterResult<Element>;

    fn index_path_of(&self, element: &Element) -> Option<IndexPath>;

    /// Every mapped element with its position descriptor, in index order.
    fn realized_paths(&self) -> Vec<(IndexPath, Element)>;
}

/// The state layouts operate on through the context traits.
struct RepeaterCore {
    id: RepeaterId,
    items: Option<ItemsSourceView>,
    factory: Arc<dyn ElementFactory>,
    realized: RealizedElements,
    children: Vec<Element>,
    parent_path: IndexPath,
    viewport: Option<Rect>,
    cache_lengths: (f32, f32),
    available: Size,
    layout_state: Option<Box<dyn Any + Send + Sync>>,
    layout_origin: Point,
    focused: Option<Element>,
    signals: RepeaterSignals,
}

impl RepeaterCore {
    fn realize(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> RepeaterResult<Element> {
        if !options.force_create {
            if let Some(info) = self.realized.info_at_mut(index) {
                info.keep_alive = true;
                info.suppress_auto_recycle |= options.suppress_auto_recycle;
                return Ok(info.element.clone());
            }
        }

        let items = self.items.as_ref().ok_or(RepeaterError::NoItemsSource)?;
        let data: ItemValue = items.get_at(index)?;
        let unique_id = items.key_from_index(index);

        let (element, from_items) = match data.downcast_ref::<Element>() {
            Some(element) => (element.clone(), true),
            None => {
                let element = self.factory.get_element(&ElementFactoryGetArgs {
                    index,
                    data: &data,
                    owner: self.id,
                })?;
                (element, false)
            }
        };

        if let Some(info) = self.realized.info_mut(&element) {
            // An item that is itself an element can only be realized once.
            info.keep_alive = true;
            return Ok(element);
        }

        self.attach(&element);
        self.realized.insert(RealizedInfo {
            element: element.clone(),
            index,
            path: self.parent_path.child(index),
            unique_id,
            keep_alive: true,
            suppress_auto_recycle: options.suppress_auto_recycle,
            pin_count: 0,
            from_items,
            mapped: false,
        });

        tracing::trace!(
            target: "horizon_repeater::repeater",
            repeater = self.id.as_u64(),
            index,
            element = element.id().as_u64(),
            from_items,
            "realized element"
        );
        self.signals.element_prepared.emit((element.clone(), index));
        Ok(element)
    }

    fn recycle(&mut self, element: &Element) -> RepeaterResult<()> {
        match self.realized.remove(element) {
            Some(info) => {
                self.release(info);
                Ok(())
            }
            None => {
                tracing::warn!(
                    target: "horizon_repeater::repeater",
                    repeater = self.id.as_u64(),
                    element = element.id().as_u64(),
                    "recycle requested for an element this repeater has not realized"
                );
                Err(RepeaterError::ElementNotOwned)
            }
        }
    }

    /// Hand an untracked element back to where it came from.
    fn release(&mut self, info: RealizedInfo) {
        let element = info.element;
        self.signals.element_clearing.emit(element.clone());

        if self.focused.as_ref() == Some(&element) {
            self.focused = None;
            self.signals.focus_lost.emit(element.clone());
        }

        if info.from_items {
            self.detach(&element);
        } else {
            self.factory.recycle_element(&ElementFactoryRecycleArgs {
                element: &element,
                owner: self.id,
            });
            element.arrange(CLEARED_BOUNDS);
        }

        tracing::trace!(
            target: "horizon_repeater::repeater",
            repeater = self.id.as_u64(),
            index = info.index,
            element = element.id().as_u64(),
            "recycled element"
        );
    }

    fn release_all(&mut self) {
        for info in self.realized.drain() {
            self.release(info);
        }
    }

    fn release_unused(&mut self) -> RepeaterResult<()> {
        for element in self.realized.unused() {
            self.recycle(&element)?;
        }
        Ok(())
    }

    fn realize_all(&mut self) -> RepeaterResult<()> {
        self.realized.begin_pass();
        for index in 0..self.item_count() {
            self.realize(index, ElementRealizationOptions::NONE)?;
        }
        self.release_unused()
    }

    fn attach(&mut self, element: &Element) {
        element.set_owner(Some(self.id));
        if !self.children.contains(element) {
            self.children.push(element.clone());
        }
    }

    fn detach(&mut self, element: &Element) {
        if element.owner() == Some(self.id) {
            element.set_owner(None);
        }
        self.children.retain(|child| child != element);
    }

    fn detach_all(&mut self) {
        for child in std::mem::take(&mut self.children) {
            if child.owner() == Some(self.id) {
                child.set_owner(None);
            }
        }
    }

    fn default_window(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.available)
    }
}

impl LayoutContext for RepeaterCore {
    fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, ItemsSourceView::count)
    }

    fn get_item_at(&self, index: usize) -> RepeaterResult<ItemValue> {
        self.items
            .as_ref()
            .ok_or(RepeaterError::NoItemsSource)?
            .get_at(index)
    }

    fn layout_state(&mut self) -> &mut Option<Box<dyn Any + Send + Sync>> {
        &mut self.layout_state
    }
}

impl VirtualizingLayoutContext for RepeaterCore {
    fn realization_rect(&self) -> Rect {
        match self.viewport {
            Some(viewport) => {
                let (horizontal, vertical) = self.cache_lengths;
                viewport.inflate(
                    viewport.width() * horizontal / 2.0,
                    viewport.height() * vertical / 2.0,
                )
            }
            None => self.default_window(),
        }
    }

    fn visible_rect(&self) -> Rect {
        self.viewport.unwrap_or_else(|| self.default_window())
    }

    fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> RepeaterResult<Element> {
        self.realize(index, options)
    }

    fn try_get_element_at(&self, index: usize) -> Option<Element> {
        self.realized.element_at(index).cloned()
    }

    fn recycle_element(&mut self, element: &Element) -> RepeaterResult<()> {
        self.recycle(element)
    }

    fn realized_range(&self) -> Option<(usize, usize)> {
        self.realized.range()
    }

    fn layout_origin(&self) -> Point {
        self.layout_origin
    }

    fn set_layout_origin(&mut self, origin: Point) {
        self.layout_origin = origin;
    }
}

impl NonVirtualizingLayoutContext for RepeaterCore {
    fn children(&self) -> Vec<Element> {
        self.realized.mapped().map(|(_, element)| element.clone()).collect()
    }
}

/// Elements built by a replaced template, still attached until the pass after
/// the swap.
struct StaleElements {
    factory: Arc<dyn ElementFactory>,
    elements: Vec<Element>,
    armed: bool,
}

/// Realizes a window of items from a source into elements.
///
/// See the [module documentation](self) for the realization model.
pub struct ItemsRepeater {
    core: RepeaterCore,
    config: RepeaterConfig,
    affinity: ThreadAffinity,
    layout: Layout,
    item_template: ItemTemplate,
    pending: Arc<Mutex<VecDeque<CollectionChange>>>,
    measure_dirty: Arc<AtomicBool>,
    horizontal_cache_length: Observable<f32>,
    vertical_cache_length: Observable<f32>,
    desired_size: Size,
    last_available: Option<Size>,
    stale: Option<StaleElements>,
    anchor: AnchorTracker,
}

impl Default for ItemsRepeater {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemsRepeater {
    /// A repeater with the default configuration, a vertical
    /// [`StackLayout`](crate::layout::StackLayout) and no item template.
    pub fn new() -> Self {
        Self::with_config(RepeaterConfig::default())
    }

    pub fn with_config(config: RepeaterConfig) -> Self {
        let id = RepeaterId::next();
        let measure_dirty = Arc::new(AtomicBool::new(true));

        let horizontal_cache_length = Observable::new(config.horizontal_cache_length);
        let vertical_cache_length = Observable::new(config.vertical_cache_length);
        for length in [&horizontal_cache_length, &vertical_cache_length] {
            let dirty = measure_dirty.clone();
            length
                .changed()
                .connect(move |_| dirty.store(true, Ordering::Release));
        }

        let item_template = ItemTemplate::default();
        let factory = item_template.to_factory(&config.pool_scope);

        tracing::debug!(target: "horizon_repeater::repeater", repeater = id.as_u64(), "created repeater");

        Self {
            core: RepeaterCore {
                id,
                items: None,
                factory,
                realized: RealizedElements::default(),
                children: Vec::new(),
                parent_path: IndexPath::root(),
                viewport: None,
                cache_lengths: (config.horizontal_cache_length, config.vertical_cache_length),
                available: Size::ZERO,
                layout_state: None,
                layout_origin: Point::ZERO,
                focused: None,
                signals: RepeaterSignals::default(),
            },
            config,
            affinity: ThreadAffinity::current(),
            layout: Layout::default(),
            item_template,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            measure_dirty,
            horizontal_cache_length,
            vertical_cache_length,
            desired_size: Size::ZERO,
            last_available: None,
            stale: None,
            anchor: AnchorTracker::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> RepeaterId {
        self.core.id
    }

    pub fn config(&self) -> &RepeaterConfig {
        &self.config
    }

    pub fn signals(&self) -> &RepeaterSignals {
        &self.core.signals
    }

    // =========================================================================
    // Items, template and layout
    // =========================================================================

    /// Replace the items source.
    ///
    /// Every realized element is recycled. With `None` all children are also
    /// detached; pooled elements can still be reused once a source is set again.
    pub fn set_items_source(&mut self, source: Option<Arc<dyn ItemsSource>>) {
        self.affinity.debug_assert_same_thread();
        match (&self.core.items, &source) {
            (Some(current), Some(new)) if current.wraps(new) => return,
            (None, None) => return,
            _ => {}
        }

        self.pending.lock().clear();
        self.core.release_all();
        if source.is_none() {
            self.core.detach_all();
        }
        self.core.items = None;
        self.anchor.clear();
        if let Layout::Virtualizing(layout) = &self.layout {
            layout.on_items_changed(&mut self.core, &CollectionChange::reset());
        }

        if let Some(source) = source {
            let view = ItemsSourceView::new(source);
            let pending = self.pending.clone();
            let dirty = self.measure_dirty.clone();
            view.connect_changed(move |change| {
                pending.lock().push_back(*change);
                dirty.store(true, Ordering::Release);
            });
            tracing::debug!(
                target: "horizon_repeater::items",
                repeater = self.core.id.as_u64(),
                count = view.count(),
                observable = view.is_observable(),
                "items source set"
            );
            self.core.items = Some(view);
        }
        self.invalidate_measure();
    }

    pub fn items_source_view(&self) -> Option<&ItemsSourceView> {
        self.core.items.as_ref()
    }

    /// Replace how items become elements.
    ///
    /// Realized elements are recycled into the old factory's pool but stay
    /// attached through the next pass, so the child count is briefly the old
    /// elements plus the new ones. They are detached when the pass after that
    /// starts.
    pub fn set_item_template(&mut self, template: impl Into<ItemTemplate>) {
        self.affinity.debug_assert_same_thread();
        if let Some(previous) = self.stale.take() {
            self.detach_stale(previous);
        }

        self.core.release_all();
        let template = template.into();
        let factory = template.to_factory(&self.config.pool_scope);
        let old_factory = std::mem::replace(&mut self.core.factory, factory);
        self.stale = Some(StaleElements {
            factory: old_factory,
            elements: self.core.children.clone(),
            armed: false,
        });
        self.item_template = template;
        self.invalidate_measure();
    }

    pub fn item_template(&self) -> &ItemTemplate {
        &self.item_template
    }

    /// Replace the layout. Every realized element is recycled and the old
    /// layout's per-repeater state is discarded.
    pub fn set_layout(&mut self, layout: Layout) {
        self.affinity.debug_assert_same_thread();
        if let Layout::Virtualizing(old) = &self.layout {
            old.uninitialize_for_context(&mut self.core);
        }
        self.core.release_all();
        self.core.layout_state = None;
        self.core.layout_origin = Point::ZERO;
        self.layout = layout;
        if let Layout::Virtualizing(new) = &self.layout {
            new.initialize_for_context(&mut self.core);
        }
        self.last_available = None;
        self.invalidate_measure();
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // =========================================================================
    // Element access
    // =========================================================================

    /// The element realized for `index`, if any. Never realizes.
    pub fn try_get_element(&self, index: usize) -> Option<Element> {
        self.core.realized.element_at(index).cloned()
    }

    /// The index `element` is realized for.
    pub fn get_element_index(&self, element: &Element) -> Option<usize> {
        self.core.realized.info(element).map(|info| info.index)
    }

    /// Realize the element for `index` outside a layout pass and pin it.
    ///
    /// Pending collection changes are applied first so `index` refers to the
    /// source as it is now. The element stays realized until it is unpinned
    /// with [`unpin_element`](Self::unpin_element) or recycled explicitly.
    pub fn get_or_create_element(&mut self, index: usize) -> RepeaterResult<Element> {
        self.affinity.debug_assert_same_thread();
        if self.core.items.is_none() {
            return Err(RepeaterError::NoItemsSource);
        }
        self.process_pending_changes();

        let count = self.core.item_count();
        if index >= count {
            return Err(RepeaterError::IndexOutOfRange { index, count });
        }

        let element = self.core.realize(index, ElementRealizationOptions::NONE)?;
        if let Some(info) = self.core.realized.info_mut(&element) {
            info.pin_count += 1;
        }
        element.measure(self.last_available.unwrap_or(Size::INFINITE));
        Ok(element)
    }

    /// Keep `element` realized across passes. Pins are counted.
    pub fn pin_element(&mut self, element: &Element) -> RepeaterResult<()> {
        let info = self
            .core
            .realized
            .info_mut(element)
            .ok_or(RepeaterError::ElementNotOwned)?;
        info.pin_count += 1;
        Ok(())
    }

    /// Release one pin. The element becomes eligible for recycling at the end
    /// of the next pass once no pins remain.
    pub fn unpin_element(&mut self, element: &Element) -> RepeaterResult<()> {
        let info = self
            .core
            .realized
            .info_mut(element)
            .ok_or(RepeaterError::ElementNotOwned)?;
        info.pin_count = info.pin_count.saturating_sub(1);
        self.invalidate_measure();
        Ok(())
    }

    pub fn is_pinned(&self, element: &Element) -> bool {
        self.core
            .realized
            .info(element)
            .is_some_and(|info| info.is_pinned())
    }

    /// Derealize `element` now, regardless of pins.
    pub fn recycle_element(&mut self, element: &Element) -> RepeaterResult<()> {
        self.affinity.debug_assert_same_thread();
        self.core.recycle(element)?;
        self.invalidate_measure();
        Ok(())
    }

    /// Mark `element` as focused (pinning it), or clear focus with `None`.
    pub fn set_focused_element(&mut self, element: Option<&Element>) -> RepeaterResult<()> {
        if let Some(element) = element {
            if self.core.realized.info(element).is_none() {
                return Err(RepeaterError::ElementNotOwned);
            }
        }
        if let Some(previous) = self.core.focused.take() {
            if let Some(info) = self.core.realized.info_mut(&previous) {
                info.pin_count = info.pin_count.saturating_sub(1);
            }
        }
        if let Some(element) = element {
            if let Some(info) = self.core.realized.info_mut(element) {
                info.pin_count += 1;
            }
            self.core.focused = Some(element.clone());
        }
        Ok(())
    }

    pub fn focused_element(&self) -> Option<Element> {
        self.core.focused.clone()
    }

    /// Attached children: realized elements plus recycled ones parked for reuse.
    pub fn children(&self) -> Vec<Element> {
        self.core
            .children
            .iter()
            .filter(|child| child.owner() == Some(self.core.id))
            .cloned()
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.core
            .children
            .iter()
            .filter(|child| child.owner() == Some(self.core.id))
            .count()
    }

    /// Mapped elements in index order.
    pub fn realized_elements(&self) -> Vec<(usize, Element)> {
        self.core
            .realized
            .mapped()
            .map(|(index, element)| (index, element.clone()))
            .collect()
    }

    /// Number of realized elements, including extra elements forced for an
    /// already realized index.
    pub fn realized_count(&self) -> usize {
        self.core.realized.len()
    }

    /// First and last realized index, inclusive.
    pub fn realized_range(&self) -> Option<(usize, usize)> {
        self.core.realized.range()
    }

    /// Whether the index to element mapping is internally consistent.
    pub fn validate_mapping(&self) -> bool {
        self.core.realized.is_consistent()
            && self
                .core
                .realized
                .all()
                .iter()
                .all(|info| info.element.owner() == Some(self.core.id))
    }

    /// The position descriptor of a realized element.
    pub fn index_path_of(&self, element: &Element) -> Option<IndexPath> {
        self.core.realized.info(element).map(|info| info.path.clone())
    }

    /// The unique id the source reported for a realized element's item.
    pub fn unique_id_of(&self, element: &Element) -> Option<String> {
        self.core
            .realized
            .info(element)
            .and_then(|info| info.unique_id.clone())
    }

    pub fn parent_path(&self) -> &IndexPath {
        &self.core.parent_path
    }

    /// Place this repeater under `path` of an enclosing hierarchy.
    pub fn set_parent_path(&mut self, path: IndexPath) {
        self.core.realized.set_parent(&path);
        self.core.parent_path = path;
    }

    /// The mapped element for a full path, if the path points into this repeater.
    pub fn element_at_path(&self, path: &IndexPath) -> Option<Element> {
        if path.parent().as_ref() != Some(&self.core.parent_path) {
            return None;
        }
        self.try_get_element(path.last()?)
    }

    // =========================================================================
    // Viewport and anchoring
    // =========================================================================

    /// Set the visible part of the repeater, in its own coordinates.
    ///
    /// Non-virtualizing layouts only need a new pass if the size changed.
    pub fn set_viewport(&mut self, viewport: Rect) {
        let old = self.core.viewport.replace(viewport);
        let changed = if self.layout.is_virtualizing() {
            old != Some(viewport)
        } else {
            old.map(|old| old.size) != Some(viewport.size)
        };
        if changed {
            self.invalidate_measure();
        }
    }

    pub fn clear_viewport(&mut self) {
        if self.core.viewport.take().is_some() {
            self.invalidate_measure();
        }
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.core.viewport
    }

    /// The realization window: the viewport extended by the cache lengths.
    pub fn realization_rect(&self) -> Rect {
        self.core.realization_rect()
    }

    pub fn horizontal_cache_length(&self) -> &Observable<f32> {
        &self.horizontal_cache_length
    }

    pub fn vertical_cache_length(&self) -> &Observable<f32> {
        &self.vertical_cache_length
    }

    /// The first realized element, in index order, that overlaps the viewport.
    pub fn current_anchor(&self) -> Option<Element> {
        let viewport = self.core.viewport?;
        self.core
            .realized
            .mapped()
            .find(|(_, element)| element.layout_slot().intersects(&viewport))
            .map(|(_, element)| element.clone())
    }

    /// How far the anchor element moved during the passes since the last call.
    /// Scrolling the viewport by this amount keeps it in place on screen.
    pub fn take_anchor_correction(&mut self) -> Option<Point> {
        self.anchor.take_correction()
    }

    // =========================================================================
    // Layout passes
    // =========================================================================

    pub fn needs_measure(&self) -> bool {
        self.measure_dirty.load(Ordering::Acquire) || !self.pending.lock().is_empty()
    }

    pub fn invalidate_measure(&self) {
        self.measure_dirty.store(true, Ordering::Release);
    }

    pub fn desired_size(&self) -> Size {
        self.desired_size
    }

    /// Apply queued collection changes in order. Returns how many were applied.
    pub fn process_pending_changes(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = self.pending.lock().pop_front();
            let Some(change) = next else {
                break;
            };
            self.apply_change(&change);
            applied += 1;
        }
        if applied > 0 {
            debug_assert!(self.core.realized.is_consistent());
        }
        applied
    }

    /// Measure the layout against `available`, realizing and recycling
    /// elements as needed.
    pub fn measure(&mut self, available: Size) -> RepeaterResult<Size> {
        self.affinity.debug_assert_same_thread();
        let _span = PerfSpan::new("repeater_measure");

        let size_changed = self.last_available != Some(available);
        self.core.available = available;
        self.core.cache_lengths = (
            self.horizontal_cache_length.get().max(0.0),
            self.vertical_cache_length.get().max(0.0),
        );

        self.process_pending_changes();
        self.release_stale();
        let id = self.core.id;
        self.core.children.retain(|child| child.owner() == Some(id));
        let anchor = self.current_anchor();
        self.anchor.capture(anchor);

        let dirty = self.measure_dirty.swap(false, Ordering::AcqRel);
        let result = match &self.layout {
            Layout::Virtualizing(layout) => {
                self.core.realized.begin_pass();
                layout
                    .measure(&mut self.core, available)
                    .and_then(|desired| self.core.release_unused().map(|()| desired))
            }
            Layout::NonVirtualizing(layout) => {
                if !dirty && !size_changed {
                    return Ok(self.desired_size);
                }
                self.core
                    .realize_all()
                    .and_then(|()| layout.measure(&mut self.core, available))
            }
        };

        match result {
            Ok(desired) => {
                self.desired_size = desired;
                self.last_available = Some(available);
                tracing::debug!(
                    target: "horizon_repeater::repeater",
                    repeater = id.as_u64(),
                    realized = self.core.realized.len(),
                    range = ?self.core.realized.range(),
                    width = desired.width,
                    height = desired.height,
                    "measure complete"
                );
                Ok(desired)
            }
            Err(err) => {
                self.invalidate_measure();
                tracing::warn!(target: "horizon_repeater::repeater", repeater = id.as_u64(), error = %err, "measure failed");
                Err(err)
            }
        }
    }

    /// Position the realized elements within `final_size`.
    pub fn arrange(&mut self, final_size: Size) -> RepeaterResult<Size> {
        self.affinity.debug_assert_same_thread();
        let _span = PerfSpan::new("repeater_arrange");

        let arranged = match &self.layout {
            Layout::Virtualizing(layout) => layout.arrange(&mut self.core, final_size)?,
            Layout::NonVirtualizing(layout) => layout.arrange(&mut self.core, final_size)?,
        };

        let realized = &self.core.realized;
        self.anchor.resolve(|element| realized.info(element).is_some());
        Ok(arranged)
    }

    /// Measure against `available`, then arrange. Unbounded dimensions are
    /// arranged at the desired size.
    pub fn update_layout(&mut self, available: Size) -> RepeaterResult<Size> {
        let desired = self.measure(available)?;
        let final_size = Size::new(
            if available.width.is_finite() { available.width } else { desired.width },
            if available.height.is_finite() { available.height } else { desired.height },
        );
        self.arrange(final_size)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply_change(&mut self, change: &CollectionChange) {
        tracing::debug!(
            target: "horizon_repeater::items",
            repeater = self.core.id.as_u64(),
            kind = ?change.kind,
            old_start = ?change.old_start_index,
            new_start = ?change.new_start_index,
            old_count = change.old_count,
            new_count = change.new_count,
            "applying collection change"
        );

        if change.kind == ChangeKind::Reset {
            self.apply_reset();
        } else {
            self.relocate(|info| change.remap_index(info.index));
        }

        if let Layout::Virtualizing(layout) = &self.layout {
            layout.on_items_changed(&mut self.core, change);
        }
        self.invalidate_measure();
    }

    fn apply_reset(&mut self) {
        // Sources with unique ids keep the elements of items that survived.
        let mut survivors: HashMap<ElementId, usize> = HashMap::new();
        if let Some(view) = self.core.items.as_ref().filter(|view| view.supports_unique_ids()) {
            for info in self.core.realized.all() {
                let index = info.unique_id.as_deref().and_then(|key| view.index_from_key(key));
                if let Some(index) = index {
                    survivors.insert(info.element.id(), index);
                }
            }
        }
        self.relocate(|info| survivors.get(&info.element.id()).copied());
        self.rebind_survivors(&survivors);

        if self.config.clear_pool_on_reset {
            for element in self.core.factory.clear_pool(self.core.id) {
                self.core.detach(&element);
            }
        }
        self.anchor.clear();
    }

    /// Bind elements kept across a reset to the item their key now maps to.
    fn rebind_survivors(&mut self, survivors: &HashMap<ElementId, usize>) {
        let Some(view) = self.core.items.as_ref() else {
            return;
        };
        let mut rebound = Vec::with_capacity(survivors.len());
        for info in self.core.realized.all() {
            if info.from_items || !survivors.contains_key(&info.element.id()) {
                continue;
            }
            match view.get_at(info.index) {
                Ok(data) => {
                    info.element.set_data_context(Some(data));
                    rebound.push((info.element.clone(), info.index));
                }
                Err(error) => tracing::warn!(
                    target: "horizon_repeater::items",
                    repeater = self.core.id.as_u64(),
                    index = info.index,
                    %error,
                    "kept element could not be rebound after reset"
                ),
            }
        }
        for (element, index) in rebound {
            self.core.signals.element_prepared.emit((element, index));
        }
    }

    /// Recycle records without a target and move the rest.
    fn relocate(&mut self, target: impl Fn(&RealizedInfo) -> Option<usize>) {
        for element in self.core.realized.orphaned_by(&target) {
            if let Some(info) = self.core.realized.remove(&element) {
                self.core.release(info);
            }
        }
        let parent = self.core.parent_path.clone();
        for (element, old, new) in self.core.realized.remap(&target, &parent) {
            self.core
                .signals
                .element_index_changed
                .emit((element, old, new));
        }
    }

    fn release_stale(&mut self) {
        let Some(stale) = self.stale.as_mut() else {
            return;
        };
        if !stale.armed {
            stale.armed = true;
            return;
        }
        if let Some(stale) = self.stale.take() {
            self.detach_stale(stale);
        }
    }

    fn detach_stale(&mut self, stale: StaleElements) {
        let mut detached = stale.factory.clear_pool(self.core.id);
        detached.extend(stale.elements);
        for element in detached {
            if self.core.realized.info(&element).is_none() {
                self.core.detach(&element);
            }
        }
    }
}

impl Realizable for ItemsRepeater {
    fn try_get_element(&self, index: usize) -> Option<Element> {
        ItemsRepeater::try_get_element(self, index)
    }

    fn get_element_index(&self, element: &Element) -> Option<usize> {
        ItemsRepeater::get_element_index(self, element)
    }

    fn get_or_create_element(&mut self, index: usize) -> RepeaterResult<Element> {
        ItemsRepeater::get_or_create_element(self, index)
    }

    fn index_path_of(&self, element: &Element) -> Option<IndexPath> {
        ItemsRepeater::index_path_of(self, element)
    }

    fn realized_paths(&self) -> Vec<(IndexPath, Element)> {
        self.core
            .realized
            .mapped()
            .map(|(index, element)| (self.core.parent_path.child(index), element.clone()))
            .collect()
    }
}

impl fmt::Debug for ItemsRepeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsRepeater")
            .field("id", &self.core.id)
            .field("items", &self.core.items)
            .field("layout", &self.layout)
            .field("item_template", &self.item_template)
            .field("realized", &self.core.realized.len())
            .field("children", &self.core.children.len())
            .field("viewport", &self.core.viewport)
            .finish()
    }
}
