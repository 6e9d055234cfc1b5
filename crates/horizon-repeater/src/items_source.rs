//! Items sources and the read-only view the repeater consumes.
//!
//! Any collection implementing [`ItemsSource`] can feed a repeater. Plain
//! `Vec<T>` works as a static source; [`ObservableVec<T>`] reports mutations
//! through a [`CollectionChange`] signal so realized elements can follow them.
//!
//! The repeater never talks to a source directly. It wraps it in an
//! [`ItemsSourceView`], which bounds-checks access, exposes optional unique ids
//! and owns the change subscriptions it creates.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use horizon_repeater_core::{ConnectionId, Signal};
use parking_lot::{Mutex, RwLock};

use crate::error::{RepeaterError, RepeaterResult};

/// A type-erased data item handed to templates and factories.
///
/// Use [`Any::downcast_ref`] to recover the concrete item type.
pub type ItemValue = Arc<dyn Any + Send + Sync>;

/// The kind of mutation described by a [`CollectionChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Remove,
    Replace,
    Move,
    Reset,
}

/// A single change notification from an items source.
///
/// Start indices are `None` when they do not apply to the change kind
/// (an insert has no old range, a remove no new range, a reset neither).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionChange {
    pub kind: ChangeKind,
    pub old_start_index: Option<usize>,
    pub new_start_index: Option<usize>,
    pub old_count: usize,
    pub new_count: usize,
}

impl CollectionChange {
    /// `count` items inserted at `index`.
    pub fn insert(index: usize, count: usize) -> Self {
        Self {
            kind: ChangeKind::Insert,
            old_start_index: None,
            new_start_index: Some(index),
            old_count: 0,
            new_count: count,
        }
    }

    /// `count` items removed starting at `index`.
    pub fn remove(index: usize, count: usize) -> Self {
        Self {
            kind: ChangeKind::Remove,
            old_start_index: Some(index),
            new_start_index: None,
            old_count: count,
            new_count: 0,
        }
    }

    /// `old_count` items at `index` replaced by `new_count` items.
    pub fn replace(index: usize, old_count: usize, new_count: usize) -> Self {
        Self {
            kind: ChangeKind::Replace,
            old_start_index: Some(index),
            new_start_index: Some(index),
            old_count,
            new_count,
        }
    }

    /// `count` items moved from `old_index` to `new_index`.
    ///
    /// `new_index` is the position of the first moved item after the move.
    pub fn move_items(old_index: usize, new_index: usize, count: usize) -> Self {
        Self {
            kind: ChangeKind::Move,
            old_start_index: Some(old_index),
            new_start_index: Some(new_index),
            old_count: count,
            new_count: count,
        }
    }

    /// The whole collection changed.
    pub fn reset() -> Self {
        Self {
            kind: ChangeKind::Reset,
            old_start_index: None,
            new_start_index: None,
            old_count: 0,
            new_count: 0,
        }
    }

    /// Where the item that was at `index` before this change is now.
    ///
    /// Returns `None` if the item no longer exists (removed, replaced or reset).
    pub fn remap_index(&self, index: usize) -> Option<usize> {
        let old_start = self.old_start_index.unwrap_or(0);
        let new_start = self.new_start_index.unwrap_or(0);
        match self.kind {
            ChangeKind::Reset => None,
            ChangeKind::Insert => Some(if index >= new_start {
                index + self.new_count
            } else {
                index
            }),
            ChangeKind::Remove | ChangeKind::Replace => {
                let old_end = old_start + self.old_count;
                if index < old_start {
                    Some(index)
                } else if index < old_end {
                    None
                } else {
                    Some(index - self.old_count + self.new_count)
                }
            }
            ChangeKind::Move => {
                let count = self.old_count;
                if (old_start..old_start + count).contains(&index) {
                    return Some(new_start + (index - old_start));
                }
                let without = if index >= old_start + count {
                    index - count
                } else {
                    index
                };
                Some(if without >= new_start {
                    without + count
                } else {
                    without
                })
            }
        }
    }
}

/// A collection that can feed a repeater.
pub trait ItemsSource: Send + Sync {
    /// Number of items currently in the collection.
    fn count(&self) -> usize;

    /// The item at `index`, or `None` if out of range.
    fn item_at(&self, index: usize) -> Option<ItemValue>;

    /// Whether [`key_from_index`](Self::key_from_index) yields stable ids.
    fn supports_unique_ids(&self) -> bool {
        false
    }

    fn key_from_index(&self, _index: usize) -> Option<String> {
        None
    }

    fn index_from_key(&self, _key: &str) -> Option<usize> {
        None
    }

    /// Change notifications, if the collection reports mutations.
    fn collection_changed(&self) -> Option<&Signal<CollectionChange>> {
        None
    }
}

impl<T> ItemsSource for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn count(&self) -> usize {
        self.len()
    }

    fn item_at(&self, index: usize) -> Option<ItemValue> {
        self.get(index).map(|item| Arc::new(item.clone()) as ItemValue)
    }
}

type KeyExtractor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A vector that reports every mutation as a [`CollectionChange`].
///
/// # Example
///
/// ```
/// use horizon_repeater::ObservableVec;
///
/// let items = ObservableVec::new(vec![1, 2, 3]);
/// items.collection_changed.connect(|change| println!("{:?}", change));
/// items.push(4);
/// items.remove(0);
/// ```
pub struct ObservableVec<T> {
    items: RwLock<Vec<T>>,
    key_fn: Option<KeyExtractor<T>>,
    /// Emitted after each mutation, once the new contents are readable.
    pub collection_changed: Signal<CollectionChange>,
}

impl<T> ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            key_fn: None,
            collection_changed: Signal::new(),
        }
    }

    /// Create a collection whose items have stable unique ids.
    pub fn with_keys<F>(items: Vec<T>, key_fn: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            items: RwLock::new(items),
            key_fn: Some(Arc::new(key_fn)),
            collection_changed: Signal::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Read-only access to the items.
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    /// Appends an item to the end.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.collection_changed
            .emit(CollectionChange::insert(index, 1));
    }

    /// Inserts an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item);
        self.collection_changed
            .emit(CollectionChange::insert(index, 1));
    }

    /// Inserts several items starting at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_range(&self, index: usize, new_items: Vec<T>) {
        let count = new_items.len();
        if count == 0 {
            return;
        }
        {
            let mut items = self.items.write();
            items.splice(index..index, new_items);
        }
        self.collection_changed
            .emit(CollectionChange::insert(index, count));
    }

    /// Removes and returns the item at `index`, or `None` if out of range.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.collection_changed
            .emit(CollectionChange::remove(index, 1));
        Some(removed)
    }

    /// Removes `count` items starting at `index`.
    ///
    /// Returns the removed items; nothing is removed if the range is out of bounds.
    pub fn remove_range(&self, index: usize, count: usize) -> Vec<T> {
        let removed: Vec<T> = {
            let mut items = self.items.write();
            if count == 0 || index + count > items.len() {
                return Vec::new();
            }
            items.drain(index..index + count).collect()
        };
        self.collection_changed
            .emit(CollectionChange::remove(index, count));
        removed
    }

    /// Replaces the item at `index`, returning the old one.
    pub fn replace(&self, index: usize, item: T) -> Option<T> {
        let old = {
            let mut items = self.items.write();
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item)
        };
        self.collection_changed
            .emit(CollectionChange::replace(index, 1, 1));
        Some(old)
    }

    /// Moves the item at `from` so that it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        {
            let mut items = self.items.write();
            if from >= items.len() || to >= items.len() {
                return false;
            }
            if from == to {
                return true;
            }
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.collection_changed
            .emit(CollectionChange::move_items(from, to, 1));
        true
    }

    /// Replaces all items.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.collection_changed.emit(CollectionChange::reset());
    }

    /// Removes all items.
    pub fn clear(&self) {
        self.items.write().clear();
        self.collection_changed.emit(CollectionChange::reset());
    }
}

impl<T> ItemsSource for ObservableVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn count(&self) -> usize {
        self.len()
    }

    fn item_at(&self, index: usize) -> Option<ItemValue> {
        self.get(index).map(|item| Arc::new(item) as ItemValue)
    }

    fn supports_unique_ids(&self) -> bool {
        self.key_fn.is_some()
    }

    fn key_from_index(&self, index: usize) -> Option<String> {
        let key_fn = self.key_fn.as_ref()?;
        self.items.read().get(index).map(|item| key_fn(item))
    }

    fn index_from_key(&self, key: &str) -> Option<usize> {
        let key_fn = self.key_fn.as_ref()?;
        self.items.read().iter().position(|item| key_fn(item) == key)
    }

    fn collection_changed(&self) -> Option<&Signal<CollectionChange>> {
        Some(&self.collection_changed)
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableVec")
            .field("items", &*self.items.read())
            .field("keyed", &self.key_fn.is_some())
            .finish()
    }
}

/// Read-only adapter over an [`ItemsSource`].
///
/// The view shares the source with whoever created it; it never copies items.
/// Subscriptions made through [`connect_changed`](Self::connect_changed) are
/// disconnected when the view is dropped, so swapping a repeater's source
/// cannot leave a stale callback behind.
pub struct ItemsSourceView {
    source: Arc<dyn ItemsSource>,
    subscriptions: Mutex<Vec<ConnectionId>>,
}

impl ItemsSourceView {
    pub fn new(source: Arc<dyn ItemsSource>) -> Self {
        Self {
            source,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Number of items as currently reported by the source.
    pub fn count(&self) -> usize {
        self.source.count()
    }

    /// The item at `index`.
    ///
    /// Fails with [`RepeaterError::IndexOutOfRange`] outside `[0, count)`.
    pub fn get_at(&self, index: usize) -> RepeaterResult<ItemValue> {
        let count = self.count();
        if index >= count {
            return Err(RepeaterError::IndexOutOfRange { index, count });
        }
        self.source
            .item_at(index)
            .ok_or(RepeaterError::IndexOutOfRange { index, count })
    }

    pub fn supports_unique_ids(&self) -> bool {
        self.source.supports_unique_ids()
    }

    pub fn key_from_index(&self, index: usize) -> Option<String> {
        if !self.supports_unique_ids() {
            return None;
        }
        self.source.key_from_index(index)
    }

    pub fn index_from_key(&self, key: &str) -> Option<usize> {
        if !self.supports_unique_ids() {
            return None;
        }
        self.source.index_from_key(key)
    }

    /// Whether the source reports mutations.
    pub fn is_observable(&self) -> bool {
        self.source.collection_changed().is_some()
    }

    /// Subscribe to the source's change notifications.
    ///
    /// Returns `None` for sources that do not report changes.
    pub fn connect_changed<F>(&self, slot: F) -> Option<ConnectionId>
    where
        F: Fn(&CollectionChange) + Send + Sync + 'static,
    {
        let signal = self.source.collection_changed()?;
        let id = signal.connect(slot);
        self.subscriptions.lock().push(id);
        Some(id)
    }

    /// The wrapped source.
    pub fn source(&self) -> &Arc<dyn ItemsSource> {
        &self.source
    }

    /// Whether this view wraps `source`.
    pub fn wraps(&self, source: &Arc<dyn ItemsSource>) -> bool {
        Arc::ptr_eq(&self.source, source)
    }
}

impl Drop for ItemsSourceView {
    fn drop(&mut self) {
        let ids: Vec<ConnectionId> = self.subscriptions.lock().drain(..).collect();
        if let Some(signal) = self.source.collection_changed() {
            for id in ids {
                signal.disconnect(id);
            }
        }
    }
}

impl fmt::Debug for ItemsSourceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsSourceView")
            .field("count", &self.count())
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}
