//! Named resource containers and the per-kind availability index.

use std::collections::{BTreeSet, HashMap, VecDeque};

use fabrik_types::{KindId, LocationId, ResourceId};

/// Per-kind count of *available* (unreserved) resources at one location.
///
/// Keeps `find` feasibility checks O(1); reservation and withdrawal update
/// the counts incrementally.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    by_kind: HashMap<KindId, usize>,
    total: usize,
}

impl ResourceIndex {
    pub fn add(&mut self, kind: KindId) {
        *self.by_kind.entry(kind).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn remove(&mut self, kind: KindId) {
        if let Some(count) = self.by_kind.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
        self.total = self.total.saturating_sub(1);
    }

    pub fn available_of(&self, kind: KindId) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_available(&self) -> usize {
        self.total
    }

    pub(crate) fn by_kind(&self) -> impl Iterator<Item = (KindId, usize)> + '_ {
        self.by_kind.iter().map(|(&kind, &count)| (kind, count))
    }
}

/// A named, unordered-multiset-semantics bag of resources with outbound
/// links to peer locations.
///
/// Contents preserve insertion order because selection is defined as "first
/// n matching, in insertion order" for reproducibility.
#[derive(Debug)]
pub struct Location {
    pub(crate) name: String,
    /// Storage cap for unit input/output locations; `None` is unbounded.
    pub(crate) capacity: Option<u32>,
    pub(crate) contents: VecDeque<ResourceId>,
    pub(crate) links: BTreeSet<LocationId>,
    pub(crate) index: ResourceIndex,
}

impl Location {
    pub(crate) fn new(name: impl Into<String>, capacity: Option<u32>) -> Self {
        Self {
            name: name.into(),
            capacity,
            contents: VecDeque::new(),
            links: BTreeSet::new(),
            index: ResourceIndex::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    /// Number of resources physically present, reserved ones included.
    pub fn occupancy(&self) -> usize {
        self.contents.len()
    }

    pub fn contents(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.contents.iter().copied()
    }

    pub fn links(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.links.iter().copied()
    }

    pub fn is_linked_to(&self, to: LocationId) -> bool {
        self.links.contains(&to)
    }

    /// Unreserved resources of `kind` currently here.
    pub fn available_of(&self, kind: KindId) -> usize {
        self.index.available_of(kind)
    }

    pub fn total_available(&self) -> usize {
        self.index.total_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_tracks_per_kind_and_total_counts() {
        let mut index = ResourceIndex::default();
        let widget = KindId::new(0);
        let gear = KindId::new(1);

        index.add(widget);
        index.add(widget);
        index.add(gear);
        assert_eq!(index.available_of(widget), 2);
        assert_eq!(index.available_of(gear), 1);
        assert_eq!(index.total_available(), 3);

        index.remove(widget);
        assert_eq!(index.available_of(widget), 1);
        assert_eq!(index.total_available(), 2);
    }

    #[test]
    fn location_reports_links_and_occupancy() {
        let mut loc = Location::new("depot", Some(10));
        loc.links.insert(LocationId::new(3));
        loc.contents.push_back(ResourceId::new(0));

        assert_eq!(loc.name(), "depot");
        assert_eq!(loc.capacity(), Some(10));
        assert_eq!(loc.occupancy(), 1);
        assert!(loc.is_linked_to(LocationId::new(3)));
        assert!(!loc.is_linked_to(LocationId::new(4)));
    }
}
