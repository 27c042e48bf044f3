//! Resource instances and the interned kind registry.
//!
//! A resource is an opaque unit carrying a kind tag; identity is the slot
//! index in the store's arena, never the value. Slots are immutable after
//! creation except for their lifecycle fields (holder, reservation).

use std::collections::HashMap;

use fabrik_types::{ClaimId, KindId, LocationId};

/// Where a resource currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    /// Present in a location, possibly reserved by a pending claim.
    At(LocationId),
    /// Consumed as a production input.
    Consumed,
    /// Discarded by the defect policy before transit.
    Discarded,
}

/// One resource instance in the arena.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSlot {
    pub kind: KindId,
    pub holder: Holder,
    /// A reserved resource stays in its location but is invisible to other
    /// claims until the owning claim consumes or releases it.
    pub reserved_by: Option<ClaimId>,
}

/// An interned component kind.
///
/// Components of a kind share their declared origin location, so the origin
/// lives here rather than on every instance.
#[derive(Debug, Clone)]
pub struct KindEntry {
    pub name: String,
    pub origin: Option<LocationId>,
}

/// Name-to-id interner for component kinds.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: Vec<KindEntry>,
    by_name: HashMap<String, KindId>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, keeping the first registration's origin.
    pub fn register(&mut self, name: &str, origin: Option<LocationId>) -> KindId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = KindId::new(self.kinds.len() as u32);
        self.kinds.push(KindEntry {
            name: name.to_string(),
            origin,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: KindId) -> &str {
        &self.kinds[id.index()].name
    }

    pub fn origin(&self, id: KindId) -> Option<LocationId> {
        self.kinds[id.index()].origin
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_interns_by_name() {
        let mut kinds = KindRegistry::new();
        let widget = kinds.register("widget", Some(LocationId::new(0)));
        let gear = kinds.register("gear", None);

        assert_ne!(widget, gear);
        assert_eq!(kinds.register("widget", None), widget);
        assert_eq!(kinds.lookup("gear"), Some(gear));
        assert_eq!(kinds.lookup("cog"), None);
        assert_eq!(kinds.name(widget), "widget");
        assert_eq!(kinds.origin(widget), Some(LocationId::new(0)));
        assert_eq!(kinds.len(), 2);
    }
}
