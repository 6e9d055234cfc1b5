//! The selection model.
//!
//! Selection is stored as a set of [`IndexPath`]s, so it is independent of
//! realization: selecting an item that has no element yet, or that belongs
//! to a level the model knows nothing about, simply records the path. When a
//! [`SelectionSource`] is attached, it supplies the shape of the data for
//! bounds checks, "select all", indeterminate parents and ranges that cross
//! levels.
//!
//! # Flat and Hierarchical Access
//!
//! The flat methods (`select(index)`, `is_selected(index)`, ...) are shorthands
//! for the path methods on single-level paths.
//!
//! ```
//! use horizon_repeater::{IndexPath, SelectionModel};
//!
//! let mut model = SelectionModel::new();
//! model.select_at(IndexPath::from([2, 1]));
//!
//! assert_eq!(model.is_selected_at(&IndexPath::from([2, 1])), Some(true));
//! assert_eq!(model.is_selected_at(&IndexPath::from([2, 0])), Some(false));
//! // A parent with some selected descendants is indeterminate.
//! assert_eq!(model.is_selected_at(&IndexPath::from([2])), None);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use horizon_repeater_core::{Observable, PropertyChange, Signal, ThreadAffinity};

use super::IndexPath;
use crate::items_source::{ChangeKind, CollectionChange, ItemsSource};

/// Describes the shape of the data a [`SelectionModel`] selects in.
pub trait SelectionSource: Send + Sync {
    /// Number of children under `path` (the root for an empty path), or
    /// `None` if that part of the data is not known yet.
    fn child_count(&self, path: &IndexPath) -> Option<usize>;
}

impl<F> SelectionSource for F
where
    F: Fn(&IndexPath) -> Option<usize> + Send + Sync,
{
    fn child_count(&self, path: &IndexPath) -> Option<usize> {
        self(path)
    }
}

/// A single-level source: the items of an [`ItemsSource`], none of which
/// have children.
pub struct FlatSelectionSource(pub Arc<dyn ItemsSource>);

impl SelectionSource for FlatSelectionSource {
    fn child_count(&self, path: &IndexPath) -> Option<usize> {
        match path.len() {
            0 => Some(self.0.count()),
            _ => Some(0),
        }
    }
}

/// Payload of [`SelectionModel::selection_changed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChangedArgs {
    pub selected: Vec<IndexPath>,
    pub deselected: Vec<IndexPath>,
}

impl SelectionChangedArgs {
    fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deselected.is_empty()
    }
}

/// Tracks which items are selected.
pub struct SelectionModel {
    selected: BTreeSet<IndexPath>,
    anchor: Option<IndexPath>,
    single_select: Observable<bool>,
    source: Option<Arc<dyn SelectionSource>>,
    affinity: ThreadAffinity,
    selection_changed: Signal<SelectionChangedArgs>,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    /// A multi-select model without a source.
    pub fn new() -> Self {
        Self {
            selected: BTreeSet::new(),
            anchor: None,
            single_select: Observable::new(false),
            source: None,
            affinity: ThreadAffinity::current(),
            selection_changed: Signal::new(),
        }
    }

    pub fn single() -> Self {
        let model = Self::new();
        model.single_select.set_silent(true);
        model
    }

    pub fn with_source(mut self, source: Arc<dyn SelectionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Fires once per operation that changed the selection.
    pub fn selection_changed(&self) -> &Signal<SelectionChangedArgs> {
        &self.selection_changed
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn is_single_select(&self) -> bool {
        self.single_select.get()
    }

    /// Switch between single and multiple selection. Turning single selection
    /// on keeps only the anchor (if selected) or the first selected path.
    pub fn set_single_select(&mut self, single: bool) {
        self.affinity.debug_assert_same_thread();
        if !self.single_select.set(single) || !single || self.selected.len() <= 1 {
            return;
        }
        let keep = self
            .anchor
            .clone()
            .filter(|anchor| self.selected.contains(anchor))
            .or_else(|| self.selected.iter().next().cloned());
        let mut args = SelectionChangedArgs::default();
        self.selected.retain(|path| {
            let kept = Some(path) == keep.as_ref();
            if !kept {
                args.deselected.push(path.clone());
            }
            kept
        });
        self.notify(args);
    }

    pub fn single_select_changed(&self) -> &Signal<PropertyChange<bool>> {
        self.single_select.changed()
    }

    pub fn source(&self) -> Option<&Arc<dyn SelectionSource>> {
        self.source.as_ref()
    }

    /// Attach or replace the data shape and drop selections it rules out.
    pub fn set_source(&mut self, source: Option<Arc<dyn SelectionSource>>) {
        self.source = source;
        self.reconcile();
    }

    // =========================================================================
    // Anchor
    // =========================================================================

    /// Start of the next range operation.
    pub fn anchor(&self) -> Option<&IndexPath> {
        self.anchor.as_ref()
    }

    /// Move the anchor without selecting anything.
    pub fn set_anchor(&mut self, anchor: Option<IndexPath>) {
        self.anchor = anchor;
    }

    // =========================================================================
    // Flat operations
    // =========================================================================

    pub fn select(&mut self, index: usize) {
        self.select_at(IndexPath::from_index(index));
    }

    pub fn deselect(&mut self, index: usize) {
        self.deselect_at(IndexPath::from_index(index));
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.is_selected_at(&IndexPath::from_index(index)) == Some(true)
    }

    pub fn select_range_from_anchor(&mut self, index: usize) {
        self.select_range_from_anchor_to(IndexPath::from_index(index));
    }

    pub fn deselect_range_from_anchor(&mut self, index: usize) {
        self.deselect_range_from_anchor_to(IndexPath::from_index(index));
    }

    // =========================================================================
    // Path operations
    // =========================================================================

    /// Select `path`. In single-select mode the previous selection is replaced
    /// in one notification. Out-of-bounds paths are ignored.
    pub fn select_at(&mut self, path: IndexPath) {
        self.affinity.debug_assert_same_thread();
        if !self.in_bounds(&path) {
            tracing::trace!(target: "horizon_repeater::selection", %path, "select ignored, out of bounds");
            return;
        }

        let mut args = SelectionChangedArgs::default();
        if self.is_single_select() {
            self.selected.retain(|selected| {
                let kept = *selected == path;
                if !kept {
                    args.deselected.push(selected.clone());
                }
                kept
            });
        }
        if self.selected.insert(path.clone()) {
            args.selected.push(path.clone());
        }
        self.anchor = Some(path);
        self.notify(args);
    }

    /// Deselect `path`, leaving the anchor where it is. Paths that are not
    /// selected are ignored.
    pub fn deselect_at(&mut self, path: IndexPath) {
        self.affinity.debug_assert_same_thread();
        if self.selected.remove(&path) {
            self.notify(SelectionChangedArgs {
                selected: Vec::new(),
                deselected: vec![path],
            });
        }
    }

    /// `Some(true)` if selected, `Some(false)` if neither it nor any
    /// descendant is selected, and `None` (indeterminate) if only some
    /// descendants are. A parent whose known children are all selected counts
    /// as selected.
    pub fn is_selected_at(&self, path: &IndexPath) -> Option<bool> {
        if self.selected.contains(path) {
            return Some(true);
        }
        if !self.has_selected_descendant(path) {
            return Some(false);
        }
        let children = self
            .source
            .as_ref()
            .and_then(|source| source.child_count(path))
            .unwrap_or(0);
        let all_selected = children > 0
            && (0..children).all(|i| self.is_selected_at(&path.child(i)) == Some(true));
        if all_selected { Some(true) } else { None }
    }

    /// Select every item between the anchor and `path`, inclusive.
    ///
    /// Siblings are selected by index. Across levels the range follows
    /// pre-order through the source; without a source only the two endpoints
    /// are selected. The anchor does not move. In single-select mode only
    /// `path` is selected.
    pub fn select_range_from_anchor_to(&mut self, path: IndexPath) {
        self.affinity.debug_assert_same_thread();
        if self.is_single_select() {
            let anchor = self.anchor.clone();
            self.select_at(path);
            self.anchor = anchor;
            return;
        }

        let mut args = SelectionChangedArgs::default();
        for candidate in self.range_to(&path) {
            if self.in_bounds(&candidate) && self.selected.insert(candidate.clone()) {
                args.selected.push(candidate);
            }
        }
        self.notify(args);
    }

    /// Deselect every item between the anchor and `path`, inclusive.
    pub fn deselect_range_from_anchor_to(&mut self, path: IndexPath) {
        self.affinity.debug_assert_same_thread();
        let mut args = SelectionChangedArgs::default();
        for candidate in self.range_to(&path) {
            if self.selected.remove(&candidate) {
                args.deselected.push(candidate);
            }
        }
        self.notify(args);
    }

    /// Select every item the source knows about. Needs a source and has no
    /// effect in single-select mode.
    pub fn select_all(&mut self) {
        self.affinity.debug_assert_same_thread();
        if self.is_single_select() {
            tracing::debug!(target: "horizon_repeater::selection", "select_all ignored in single-select mode");
            return;
        }
        let Some(source) = self.source.clone() else {
            tracing::debug!(target: "horizon_repeater::selection", "select_all needs a selection source");
            return;
        };

        let mut args = SelectionChangedArgs::default();
        let mut stack = vec![IndexPath::root()];
        while let Some(parent) = stack.pop() {
            let count = source.child_count(&parent).unwrap_or(0);
            for i in (0..count).rev() {
                stack.push(parent.child(i));
            }
            if !parent.is_empty() && self.selected.insert(parent.clone()) {
                args.selected.push(parent);
            }
        }
        self.notify(args);
    }

    /// Deselect everything and forget the anchor.
    pub fn clear_selection(&mut self) {
        self.affinity.debug_assert_same_thread();
        self.anchor = None;
        let deselected: Vec<IndexPath> = std::mem::take(&mut self.selected).into_iter().collect();
        self.notify(SelectionChangedArgs {
            selected: Vec::new(),
            deselected,
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Selected paths in pre-order.
    pub fn selected_paths(&self) -> Vec<IndexPath> {
        self.selected.iter().cloned().collect()
    }

    /// Selected top-level indices, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected
            .iter()
            .filter(|path| path.len() == 1)
            .filter_map(IndexPath::last)
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected_path(&self) -> Option<&IndexPath> {
        self.selected.iter().next()
    }

    // =========================================================================
    // Data changes
    // =========================================================================

    /// Shift or drop tracked paths under `parent` after its children changed.
    ///
    /// Paths of removed, replaced or reset items are deselected, along with
    /// everything below them. Paths that merely moved keep their selection.
    pub fn on_items_changed(&mut self, parent: &IndexPath, change: &CollectionChange) {
        let level = parent.len();
        let remap = |path: &IndexPath| -> Option<IndexPath> {
            if !parent.is_ancestor_of(path) {
                return Some(path.clone());
            }
            let index = path.get(level)?;
            if change.kind == ChangeKind::Reset {
                return None;
            }
            change
                .remap_index(index)
                .map(|new_index| path.with_index_at(level, new_index))
        };

        let mut args = SelectionChangedArgs::default();
        let mut shifted = BTreeSet::new();
        for path in std::mem::take(&mut self.selected) {
            match remap(&path) {
                Some(new_path) => {
                    shifted.insert(new_path);
                }
                None => args.deselected.push(path),
            }
        }
        self.selected = shifted;
        self.anchor = self.anchor.as_ref().and_then(remap);
        self.notify(args);
    }

    /// Drop selected paths the source now rules out.
    pub fn reconcile(&mut self) {
        let mut args = SelectionChangedArgs::default();
        let out_of_bounds: Vec<IndexPath> = self
            .selected
            .iter()
            .filter(|path| !self.in_bounds(path))
            .cloned()
            .collect();
        for path in out_of_bounds {
            self.selected.remove(&path);
            args.deselected.push(path);
        }
        if self.anchor.as_ref().is_some_and(|anchor| !self.in_bounds(anchor)) {
            self.anchor = None;
        }
        self.notify(args);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn notify(&self, args: SelectionChangedArgs) {
        if args.is_empty() {
            return;
        }
        tracing::debug!(
            target: "horizon_repeater::selection",
            selected = args.selected.len(),
            deselected = args.deselected.len(),
            total = self.selected.len(),
            "selection changed"
        );
        self.selection_changed.emit(args);
    }

    /// Every level is inside its parent's known child count. Levels the source
    /// does not know are accepted.
    fn in_bounds(&self, path: &IndexPath) -> bool {
        if path.is_empty() {
            return false;
        }
        let Some(source) = &self.source else {
            return true;
        };
        let mut parent = IndexPath::root();
        for &index in path.indices() {
            if let Some(count) = source.child_count(&parent) {
                if index >= count {
                    return false;
                }
            }
            parent = parent.child(index);
        }
        true
    }

    fn has_selected_descendant(&self, path: &IndexPath) -> bool {
        self.selected
            .range((Bound::Excluded(path.clone()), Bound::Unbounded))
            .next()
            .is_some_and(|next| path.is_ancestor_of(next))
    }

    /// The paths from the anchor to `path`, inclusive, in pre-order.
    fn range_to(&self, path: &IndexPath) -> Vec<IndexPath> {
        let anchor = self
            .anchor
            .clone()
            .unwrap_or_else(|| path.with_last(0));
        let (start, end) = if anchor <= *path {
            (anchor, path.clone())
        } else {
            (path.clone(), anchor)
        };

        if start.parent() == end.parent() {
            let (Some(first), Some(last)) = (start.last(), end.last()) else {
                return Vec::new();
            };
            return (first..=last).map(|i| start.with_last(i)).collect();
        }

        match &self.source {
            Some(source) => {
                let mut range = vec![start.clone()];
                let mut current = start;
                while current != end {
                    match next_in_pre_order(source.as_ref(), &current) {
                        Some(next) if next <= end => {
                            range.push(next.clone());
                            current = next;
                        }
                        _ => {
                            range.push(end);
                            break;
                        }
                    }
                }
                range
            }
            None => vec![start, end],
        }
    }
}

/// The path after `path` in a pre-order walk of `source`.
fn next_in_pre_order(source: &dyn SelectionSource, path: &IndexPath) -> Option<IndexPath> {
    if source.child_count(path).unwrap_or(0) > 0 {
        return Some(path.child(0));
    }
    let mut current = path.clone();
    loop {
        let parent = current.parent()?;
        let index = current.last()?;
        if index + 1 < source.child_count(&parent)? {
            return Some(parent.child(index + 1));
        }
        if parent.is_empty() {
            return None;
        }
        current = parent;
    }
}

impl fmt::Debug for SelectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionModel")
            .field("selected", &self.selected)
            .field("anchor", &self.anchor)
            .field("single_select", &self.is_single_select())
            .field("has_source", &self.source.is_some())
            .finish()
    }
}
