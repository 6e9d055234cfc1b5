//! Keyed pools of derealized elements.
//!
//! A [`RecyclePool`] buckets unused elements by [`TemplateKey`] so a later
//! realization with the same template can reuse one instead of building a new
//! visual. Pools can be private to a repeater or handed out by a
//! [`RecyclePoolRegistry`] owned by the application, which lets several
//! repeaters sharing a template also share its elements.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::element::{Element, ElementId};
use crate::repeater::RepeaterId;
use crate::template::{DataTemplate, TemplateId, TemplateKey};

struct PoolEntry {
    element: Element,
    owner: Option<RepeaterId>,
}

#[derive(Default)]
struct PoolInner {
    buckets: HashMap<TemplateKey, Vec<PoolEntry>>,
    members: HashSet<ElementId>,
}

/// A keyed multi-set of unused elements.
///
/// Retrieval is LIFO per key, preferring elements last owned by the asking
/// repeater so shared pools do not shuffle elements between repeaters needlessly.
#[derive(Default)]
pub struct RecyclePool {
    inner: Mutex<PoolInner>,
}

impl RecyclePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element` under `key`.
    ///
    /// Putting an element that is already pooled is ignored.
    pub fn put(&self, key: TemplateKey, element: Element, owner: Option<RepeaterId>) {
        let mut inner = self.inner.lock();
        if !inner.members.insert(element.id()) {
            tracing::warn!(
                target: "horizon_repeater::pool",
                element = element.id().as_u64(),
                key = %key,
                "element is already pooled, ignoring put"
            );
            return;
        }
        tracing::trace!(target: "horizon_repeater::pool", element = element.id().as_u64(), key = %key, "put");
        inner
            .buckets
            .entry(key)
            .or_default()
            .push(PoolEntry { element, owner });
    }

    /// Remove and return an element stored under `key`.
    pub fn try_get(&self, key: &TemplateKey, owner: Option<RepeaterId>) -> Option<Element> {
        let mut inner = self.inner.lock();
        let bucket = inner.buckets.get_mut(key)?;
        let position = bucket
            .iter()
            .rposition(|entry| owner.is_some() && entry.owner == owner)
            .or_else(|| bucket.len().checked_sub(1))?;
        let entry = bucket.remove(position);
        if bucket.is_empty() {
            inner.buckets.remove(key);
        }
        inner.members.remove(&entry.element.id());
        tracing::trace!(target: "horizon_repeater::pool", element = entry.element.id().as_u64(), key = %key, "reused");
        Some(entry.element)
    }

    /// Whether `element` is currently pooled.
    pub fn contains(&self, element: &Element) -> bool {
        self.inner.lock().members.contains(&element.id())
    }

    /// Number of pooled elements across all keys.
    pub fn len(&self) -> usize {
        self.inner.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pooled elements under `key`.
    pub fn count_for(&self, key: &TemplateKey) -> usize {
        self.inner
            .lock()
            .buckets
            .get(key)
            .map_or(0, |bucket| bucket.len())
    }

    /// Evict every entry, returning the evicted elements.
    pub fn clear(&self) -> Vec<Element> {
        let mut inner = self.inner.lock();
        inner.members.clear();
        let evicted: Vec<Element> = inner
            .buckets
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter().map(|entry| entry.element))
            .collect();
        tracing::debug!(target: "horizon_repeater::pool", evicted = evicted.len(), "pool cleared");
        evicted
    }

    /// Evict the entries last owned by `owner`, returning them.
    pub fn clear_owned_by(&self, owner: RepeaterId) -> Vec<Element> {
        let mut inner = self.inner.lock();
        let mut evicted = Vec::new();
        for bucket in inner.buckets.values_mut() {
            let (gone, kept): (Vec<PoolEntry>, Vec<PoolEntry>) = bucket
                .drain(..)
                .partition(|entry| entry.owner == Some(owner));
            *bucket = kept;
            evicted.extend(gone.into_iter().map(|entry| entry.element));
        }
        inner.buckets.retain(|_, bucket| !bucket.is_empty());
        for element in &evicted {
            inner.members.remove(&element.id());
        }
        tracing::debug!(target: "horizon_repeater::pool", evicted = evicted.len(), "owned entries cleared");
        evicted
    }
}

impl fmt::Debug for RecyclePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RecyclePool")
            .field("keys", &inner.buckets.len())
            .field("elements", &inner.members.len())
            .finish()
    }
}

/// Application-owned directory of shared pools.
///
/// Create one at the composition root and pass it to every repeater that
/// should share elements (see `PoolScope::Shared`). A per-template pool lives
/// as long as some factory still uses it; the registry only remembers it.
#[derive(Default)]
pub struct RecyclePoolRegistry {
    by_template: Mutex<HashMap<TemplateId, Weak<RecyclePool>>>,
    shared: Arc<RecyclePool>,
}

impl RecyclePoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool dedicated to `template`, created on first use.
    pub fn pool_for_template(&self, template: &DataTemplate) -> Arc<RecyclePool> {
        let mut by_template = self.by_template.lock();
        by_template.retain(|_, pool| pool.strong_count() > 0);
        if let Some(pool) = by_template.get(&template.id()).and_then(Weak::upgrade) {
            return pool;
        }
        let pool = Arc::new(RecyclePool::new());
        by_template.insert(template.id(), Arc::downgrade(&pool));
        pool
    }

    /// A pool shared by every user of this registry, bucketed by template key.
    pub fn shared_pool(&self) -> Arc<RecyclePool> {
        self.shared.clone()
    }

    /// Number of per-template pools still in use.
    pub fn template_pool_count(&self) -> usize {
        self.by_template
            .lock()
            .values()
            .filter(|pool| pool.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for RecyclePoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclePoolRegistry")
            .field("template_pools", &self.template_pool_count())
            .field("shared", &self.shared)
            .finish()
    }
}
