//! Bookkeeping for the elements a repeater has realized.
//!
//! Every realized element has one record. At most one record per index is
//! *mapped*; further elements forced into existence for an already mapped
//! index are tracked too, but never answer index lookups.

use std::collections::{BTreeMap, HashMap};

use crate::element::{Element, ElementId};
use crate::selection::IndexPath;

#[derive(Debug, Clone)]
pub(crate) struct RealizedInfo {
    pub element: Element,
    pub index: usize,
    pub path: IndexPath,
    pub unique_id: Option<String>,
    /// Requested by the layout during the current pass.
    pub keep_alive: bool,
    pub suppress_auto_recycle: bool,
    pub pin_count: u32,
    /// The item itself is the element; it is detached, never pooled.
    pub from_items: bool,
    /// Answers lookups for `index`.
    pub mapped: bool,
}

impl RealizedInfo {
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0 || self.suppress_auto_recycle
    }
}

#[derive(Debug, Default)]
pub(crate) struct RealizedElements {
    by_index: BTreeMap<usize, ElementId>,
    by_element: HashMap<ElementId, RealizedInfo>,
}

impl RealizedElements {
    pub fn len(&self) -> usize {
        self.by_element.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }

    /// The mapped element for `index`.
    pub fn element_at(&self, index: usize) -> Option<&Element> {
        let id = self.by_index.get(&index)?;
        self.by_element.get(id).map(|info| &info.element)
    }

    pub fn info(&self, element: &Element) -> Option<&RealizedInfo> {
        self.by_element.get(&element.id())
    }

    pub fn info_mut(&mut self, element: &Element) -> Option<&mut RealizedInfo> {
        self.by_element.get_mut(&element.id())
    }

    pub fn info_at_mut(&mut self, index: usize) -> Option<&mut RealizedInfo> {
        let id = self.by_index.get(&index)?;
        self.by_element.get_mut(id)
    }

    /// Track a new element. It becomes the mapped element for its index only
    /// if the index has none.
    pub fn insert(&mut self, mut info: RealizedInfo) {
        let id = info.element.id();
        info.mapped = !self.by_index.contains_key(&info.index);
        if info.mapped {
            self.by_index.insert(info.index, id);
        }
        self.by_element.insert(id, info);
    }

    /// Stop tracking `element`. If it was mapped and a duplicate for the same
    /// index exists, the duplicate takes over the mapping.
    pub fn remove(&mut self, element: &Element) -> Option<RealizedInfo> {
        let info = self.by_element.remove(&element.id())?;
        if info.mapped {
            self.by_index.remove(&info.index);
            let successor = self
                .by_element
                .iter_mut()
                .find(|(_, other)| !other.mapped && other.index == info.index);
            if let Some((id, other)) = successor {
                other.mapped = true;
                self.by_index.insert(info.index, *id);
            }
        }
        Some(info)
    }

    /// Remove and return every record.
    pub fn drain(&mut self) -> Vec<RealizedInfo> {
        self.by_index.clear();
        let mut drained: Vec<RealizedInfo> = self.by_element.drain().map(|(_, info)| info).collect();
        drained.sort_by_key(|info| info.index);
        drained
    }

    /// Forget which elements were requested.
    pub fn begin_pass(&mut self) {
        for info in self.by_element.values_mut() {
            info.keep_alive = false;
        }
    }

    /// Elements neither requested this pass nor pinned.
    pub fn unused(&self) -> Vec<Element> {
        let mut unused: Vec<&RealizedInfo> = self
            .by_element
            .values()
            .filter(|info| !info.keep_alive && !info.is_pinned())
            .collect();
        unused.sort_by_key(|info| info.index);
        unused.into_iter().map(|info| info.element.clone()).collect()
    }

    /// Records for which `target` has no new index.
    pub fn orphaned_by(&self, target: impl Fn(&RealizedInfo) -> Option<usize>) -> Vec<Element> {
        let mut orphans: Vec<&RealizedInfo> = self
            .by_element
            .values()
            .filter(|info| target(info).is_none())
            .collect();
        orphans.sort_by_key(|info| info.index);
        orphans.into_iter().map(|info| info.element.clone()).collect()
    }

    /// Move every record to the index `target` gives it, returning
    /// `(element, old, new)` for each one that moved. Records without a target
    /// must have been removed first.
    pub fn remap(
        &mut self,
        target: impl Fn(&RealizedInfo) -> Option<usize>,
        parent: &IndexPath,
    ) -> Vec<(Element, usize, usize)> {
        let mut moved = Vec::new();
        let mut infos: Vec<&mut RealizedInfo> = self.by_element.values_mut().collect();
        infos.sort_by_key(|info| (info.index, !info.mapped));

        self.by_index.clear();
        for info in infos {
            let Some(new_index) = target(&*info) else {
                continue;
            };
            if new_index != info.index {
                moved.push((info.element.clone(), info.index, new_index));
                info.index = new_index;
                info.path = parent.child(new_index);
            }
            info.mapped = !self.by_index.contains_key(&new_index);
            if info.mapped {
                self.by_index.insert(new_index, info.element.id());
            }
        }
        moved
    }

    /// Mapped elements in index order.
    pub fn mapped(&self) -> impl Iterator<Item = (usize, &Element)> + '_ {
        self.by_index
            .iter()
            .filter_map(|(index, id)| self.by_element.get(id).map(|info| (*index, &info.element)))
    }

    /// Every record, duplicates included, in index order.
    pub fn all(&self) -> Vec<&RealizedInfo> {
        let mut all: Vec<&RealizedInfo> = self.by_element.values().collect();
        all.sort_by_key(|info| (info.index, !info.mapped));
        all
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        let first = *self.by_index.keys().next()?;
        let last = *self.by_index.keys().next_back()?;
        Some((first, last))
    }

    /// Update the position descriptors for a new parent path.
    pub fn set_parent(&mut self, parent: &IndexPath) {
        for info in self.by_element.values_mut() {
            info.path = parent.child(info.index);
        }
    }

    /// Every mapped index resolves to a record carrying that index.
    pub fn is_consistent(&self) -> bool {
        self.by_index.iter().all(|(index, id)| {
            self.by_element
                .get(id)
                .is_some_and(|info| info.index == *index && info.mapped)
        }) && self
            .by_element
            .values()
            .filter(|info| info.mapped)
            .count()
            == self.by_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::EmptyVisual;
    use crate::items_source::CollectionChange;

    fn info(index: usize) -> RealizedInfo {
        RealizedInfo {
            element: Element::new(EmptyVisual),
            index,
            path: IndexPath::from_index(index),
            unique_id: None,
            keep_alive: true,
            suppress_auto_recycle: false,
            pin_count: 0,
            from_items: false,
            mapped: false,
        }
    }

    #[test]
    fn test_duplicate_does_not_steal_mapping() {
        let mut realized = RealizedElements::default();
        let original = info(3);
        let duplicate = info(3);
        let original_element = original.element.clone();
        let duplicate_element = duplicate.element.clone();
        realized.insert(original);
        realized.insert(duplicate);

        assert_eq!(realized.len(), 2);
        assert_eq!(realized.element_at(3), Some(&original_element));

        realized.remove(&original_element);
        assert_eq!(realized.element_at(3), Some(&duplicate_element));
        assert!(realized.is_consistent());
    }

    #[test]
    fn test_remap_shifts_and_reports() {
        let mut realized = RealizedElements::default();
        for index in 0..4 {
            realized.insert(info(index));
        }
        let change = CollectionChange::remove(1, 1);
        let removed = realized.orphaned_by(|info| change.remap_index(info.index));
        assert_eq!(removed.len(), 1);
        realized.remove(&removed[0]);

        let moved = realized.remap(|info| change.remap_index(info.index), &IndexPath::root());
        let mut pairs: Vec<(usize, usize)> = moved.iter().map(|(_, old, new)| (*old, *new)).collect();
        pairs.sort();
        assert_eq!(pairs, vec![(2, 1), (3, 2)]);
        assert_eq!(realized.range(), Some((0, 2)));
        assert!(realized.is_consistent());
    }

    #[test]
    fn test_unused_skips_pinned_and_requested() {
        let mut realized = RealizedElements::default();
        let mut pinned = info(0);
        pinned.pin_count = 1;
        realized.insert(pinned);
        realized.insert(info(1));
        realized.begin_pass();
        realized.insert(info(2));

        let unused = realized.unused();
        assert_eq!(unused.len(), 1);
        assert_eq!(realized.info(&unused[0]).map(|i| i.index), Some(1));
    }
}
