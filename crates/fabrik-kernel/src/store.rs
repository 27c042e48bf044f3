//! Flat-array store of locations and resource slots.
//!
//! Entities are referenced by stable integer handles into flat arrays, which
//! keeps the unit -> location -> unit graph free of ownership cycles. All
//! mutation happens from the scheduler's single execution context; there is
//! no locking.

use std::collections::HashMap;

use fabrik_types::{ClaimId, KindId, LocationId, ResourceId};
use tracing::trace;

use crate::claim::{Predicate, Requirement};
use crate::error::SimError;
use crate::location::Location;
use crate::resource::{Holder, KindRegistry, ResourceSlot};

/// A `find` that could not satisfy its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insufficient {
    /// How many matching resources were missing.
    pub missing: u32,
}

/// The first atom a claim failed on, with its shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedAtom {
    pub atom: usize,
    pub missing: u32,
}

/// All locations, resource slots and interned kinds of a running model.
#[derive(Debug, Default)]
pub struct Store {
    locations: Vec<Location>,
    slots: Vec<ResourceSlot>,
    kinds: KindRegistry,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Assembly
    // ========================================================================

    /// Create a named location. `capacity` is the storage cap for unit
    /// input/output locations; plain buffers pass `None`.
    pub fn add_location(&mut self, name: &str, capacity: Option<u32>) -> LocationId {
        let id = LocationId::new(self.locations.len() as u32);
        self.locations.push(Location::new(name, capacity));
        id
    }

    /// Add a directed edge `from -> to`. Idempotent.
    pub fn link(&mut self, from: LocationId, to: LocationId) {
        self.locations[from.index()].links.insert(to);
    }

    pub fn is_linked(&self, from: LocationId, to: LocationId) -> bool {
        self.locations[from.index()].is_linked_to(to)
    }

    /// Intern a component kind with the location where it is produced.
    pub fn register_kind(&mut self, name: &str, origin: Option<LocationId>) -> KindId {
        self.kinds.register(name, origin)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.index()]
    }

    pub fn location_by_name(&self, name: &str) -> Option<LocationId> {
        self.locations
            .iter()
            .position(|loc| loc.name() == name)
            .map(|i| LocationId::new(i as u32))
    }

    pub fn locations_len(&self) -> usize {
        self.locations.len()
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn resource(&self, id: ResourceId) -> ResourceSlot {
        self.slots[id.index()]
    }

    /// Total number of resource instances ever created.
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    /// Resources physically present at `loc`, reserved ones included.
    pub fn occupancy(&self, loc: LocationId) -> usize {
        self.locations[loc.index()].occupancy()
    }

    /// Unreserved resources at `loc` matching `predicate`.
    pub fn available(&self, loc: LocationId, predicate: &Predicate) -> usize {
        let location = &self.locations[loc.index()];
        match predicate {
            Predicate::Kind(kind) => location.available_of(*kind),
            Predicate::Any => location.total_available(),
        }
    }

    /// Physical count of resources of `kind` at `loc`, reserved included.
    pub fn count_of(&self, loc: LocationId, kind: KindId) -> usize {
        self.locations[loc.index()]
            .contents()
            .filter(|&id| self.slots[id.index()].kind == kind)
            .count()
    }

    // ========================================================================
    // Creation and seeding
    // ========================================================================

    /// Create a fresh component of `kind` directly into `loc`,
    /// capacity-checked.
    pub fn create_into(&mut self, loc: LocationId, kind: KindId) -> Result<ResourceId, SimError> {
        self.check_capacity(loc, 1)?;
        Ok(self.create_unchecked(loc, kind))
    }

    /// Setup-time seeding. Runs before the clock advances from zero and
    /// bypasses the capacity check; during the run caps are enforced by the
    /// producing processes' pre-checks and by checked deposits.
    pub fn seed(&mut self, loc: LocationId, kind: KindId, count: u32) {
        for _ in 0..count {
            self.create_unchecked(loc, kind);
        }
        trace!(location = %self.locations[loc.index()].name(), kind = %self.kinds.name(kind), count, "seeded");
    }

    fn create_unchecked(&mut self, loc: LocationId, kind: KindId) -> ResourceId {
        let id = ResourceId::new(self.slots.len() as u64);
        self.slots.push(ResourceSlot {
            kind,
            holder: Holder::At(loc),
            reserved_by: None,
        });
        let location = &mut self.locations[loc.index()];
        location.contents.push_back(id);
        location.index.add(kind);
        id
    }

    fn check_capacity(&self, loc: LocationId, attempted: usize) -> Result<(), SimError> {
        let location = &self.locations[loc.index()];
        if let Some(capacity) = location.capacity() {
            if location.occupancy() + attempted > capacity as usize {
                return Err(SimError::CapacityExceeded {
                    location: location.name().to_string(),
                    holding: location.occupancy(),
                    capacity,
                    attempted,
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Selection and reservation
    // ========================================================================

    /// First `count` unreserved resources at `loc` matching `predicate`, in
    /// insertion order.
    pub fn find_available(
        &self,
        loc: LocationId,
        predicate: &Predicate,
        count: u32,
    ) -> Result<Vec<ResourceId>, Insufficient> {
        let feasible = self.available(loc, predicate);
        if feasible < count as usize {
            return Err(Insufficient {
                missing: count - feasible as u32,
            });
        }
        Ok(self.collect_available(loc, predicate, count))
    }

    fn collect_available(
        &self,
        loc: LocationId,
        predicate: &Predicate,
        max: u32,
    ) -> Vec<ResourceId> {
        let mut picked = Vec::with_capacity(max as usize);
        for id in self.locations[loc.index()].contents() {
            if picked.len() == max as usize {
                break;
            }
            let slot = &self.slots[id.index()];
            if slot.reserved_by.is_none() && predicate.matches(slot.kind) {
                picked.push(id);
            }
        }
        picked
    }

    /// Reserve the resources of every atom of `requirement`, in atom order,
    /// all-or-nothing. On failure nothing stays reserved and the first
    /// blocked atom is reported.
    pub fn reserve_requirement(
        &mut self,
        claim: ClaimId,
        requirement: &Requirement,
    ) -> Result<Vec<(LocationId, ResourceId)>, BlockedAtom> {
        let mut selected: Vec<(LocationId, ResourceId)> = Vec::new();
        for (position, atom) in requirement.atoms().iter().enumerate() {
            match self.find_available(atom.location, &atom.predicate, atom.count) {
                Ok(ids) => {
                    for id in ids {
                        self.reserve(id, claim);
                        selected.push((atom.location, id));
                    }
                }
                Err(insufficient) => {
                    for &(_, id) in &selected {
                        self.unreserve(id);
                    }
                    return Err(BlockedAtom {
                        atom: position,
                        missing: insufficient.missing,
                    });
                }
            }
        }
        Ok(selected)
    }

    fn reserve(&mut self, id: ResourceId, claim: ClaimId) {
        let (kind, holder) = {
            let slot = &self.slots[id.index()];
            debug_assert!(slot.reserved_by.is_none(), "double reservation");
            (slot.kind, slot.holder)
        };
        self.slots[id.index()].reserved_by = Some(claim);
        if let Holder::At(loc) = holder {
            self.locations[loc.index()].index.remove(kind);
        }
    }

    fn unreserve(&mut self, id: ResourceId) {
        let (kind, holder) = {
            let slot = &self.slots[id.index()];
            (slot.kind, slot.holder)
        };
        self.slots[id.index()].reserved_by = None;
        if let Holder::At(loc) = holder {
            self.locations[loc.index()].index.add(kind);
        }
    }

    fn ensure_reserved_by(
        &self,
        id: ResourceId,
        claim: ClaimId,
        loc: LocationId,
    ) -> Result<(), SimError> {
        let slot = &self.slots[id.index()];
        if slot.reserved_by != Some(claim) {
            return Err(SimError::invariant(format!(
                "resource {id} is not reserved by claim {claim}"
            )));
        }
        match slot.holder {
            Holder::At(at) if at == loc => Ok(()),
            holder => Err(SimError::invariant(format!(
                "resource {id} expected at {}, holder is {holder:?}",
                self.locations[loc.index()].name()
            ))),
        }
    }

    // ========================================================================
    // Committed operations on reserved resources
    // ========================================================================

    /// Withdraw reserved resources from their locations and mark them
    /// consumed.
    pub fn consume_reserved(
        &mut self,
        claim: ClaimId,
        selected: &[(LocationId, ResourceId)],
    ) -> Result<(), SimError> {
        for &(loc, id) in selected {
            self.ensure_reserved_by(id, claim, loc)?;
            self.remove_from_location(loc, id)?;
            let slot = &mut self.slots[id.index()];
            slot.reserved_by = None;
            slot.holder = Holder::Consumed;
        }
        Ok(())
    }

    /// Withdraw reserved resources and deposit them into `to`. Requires a
    /// link from every source; the deposit is capacity-checked.
    pub fn move_reserved(
        &mut self,
        claim: ClaimId,
        selected: &[(LocationId, ResourceId)],
        to: LocationId,
    ) -> Result<(), SimError> {
        for &(src, _) in selected {
            if !self.is_linked(src, to) {
                return Err(SimError::NotLinked {
                    from: self.locations[src.index()].name().to_string(),
                    to: self.locations[to.index()].name().to_string(),
                });
            }
        }
        self.check_capacity(to, selected.len())?;
        self.relocate_reserved(claim, selected, to)
    }

    /// Withdraw reserved resources and deposit them into `to`, without a
    /// link requirement (put-back primitive for `release`).
    pub fn relocate_reserved(
        &mut self,
        claim: ClaimId,
        selected: &[(LocationId, ResourceId)],
        to: LocationId,
    ) -> Result<(), SimError> {
        for &(src, id) in selected {
            self.ensure_reserved_by(id, claim, src)?;
            self.remove_from_location(src, id)?;
            let kind = {
                let slot = &mut self.slots[id.index()];
                slot.reserved_by = None;
                slot.holder = Holder::At(to);
                slot.kind
            };
            let location = &mut self.locations[to.index()];
            location.contents.push_back(id);
            location.index.add(kind);
        }
        Ok(())
    }

    /// Clear reservations, leaving each resource exactly where it sits.
    /// Positions are preserved, so a claim-then-cancel round trip leaves the
    /// location contents identical.
    pub fn unreserve_all(
        &mut self,
        claim: ClaimId,
        selected: &[(LocationId, ResourceId)],
    ) -> Result<(), SimError> {
        for &(loc, id) in selected {
            self.ensure_reserved_by(id, claim, loc)?;
            self.unreserve(id);
        }
        Ok(())
    }

    /// Withdraw up to `count` available matching resources at `loc` and mark
    /// them discarded (the defect path). Returns how many were taken.
    pub fn discard_available(
        &mut self,
        loc: LocationId,
        predicate: &Predicate,
        count: u32,
    ) -> Result<u32, SimError> {
        let ids = self.collect_available(loc, predicate, count);
        for &id in &ids {
            self.remove_from_location(loc, id)?;
            self.slots[id.index()].holder = Holder::Discarded;
        }
        Ok(ids.len() as u32)
    }

    fn remove_from_location(&mut self, loc: LocationId, id: ResourceId) -> Result<(), SimError> {
        let (kind, reserved) = {
            let slot = &self.slots[id.index()];
            (slot.kind, slot.reserved_by.is_some())
        };
        let location = &mut self.locations[loc.index()];
        let Some(position) = location.contents.iter().position(|&r| r == id) else {
            return Err(SimError::invariant(format!(
                "resource {id} not present at {}",
                location.name()
            )));
        };
        location.contents.remove(position);
        // Reserved resources left the availability index when reserved.
        if !reserved {
            location.index.remove(kind);
        }
        Ok(())
    }

    // ========================================================================
    // Conservation audit
    // ========================================================================

    /// Verify conservation-of-instances and index consistency.
    ///
    /// Every created resource must be present in exactly one location, or
    /// consumed, or discarded; every availability index must agree with a
    /// recount of unreserved contents.
    pub fn audit(&self) -> Result<(), SimError> {
        let mut seen = vec![false; self.slots.len()];

        for (li, location) in self.locations.iter().enumerate() {
            let mut available: HashMap<KindId, usize> = HashMap::new();
            let mut total_available = 0usize;

            for id in location.contents() {
                let slot = &self.slots[id.index()];
                if seen[id.index()] {
                    return Err(SimError::invariant(format!(
                        "resource {id} present in two locations"
                    )));
                }
                seen[id.index()] = true;
                match slot.holder {
                    Holder::At(at) if at.index() == li => {}
                    holder => {
                        return Err(SimError::invariant(format!(
                            "resource {id} listed at {} but holder is {holder:?}",
                            location.name()
                        )));
                    }
                }
                if slot.reserved_by.is_none() {
                    *available.entry(slot.kind).or_insert(0) += 1;
                    total_available += 1;
                }
            }

            if location.total_available() != total_available {
                return Err(SimError::invariant(format!(
                    "index total at {} is {}, recount is {total_available}",
                    location.name(),
                    location.total_available()
                )));
            }
            for (kind, count) in location.index.by_kind() {
                if available.get(&kind).copied().unwrap_or(0) != count {
                    return Err(SimError::invariant(format!(
                        "index at {} counts {count} of kind {}, recount disagrees",
                        location.name(),
                        self.kinds.name(kind)
                    )));
                }
            }
        }

        for (i, slot) in self.slots.iter().enumerate() {
            match slot.holder {
                Holder::At(_) if !seen[i] => {
                    return Err(SimError::invariant(format!(
                        "resource {i} lost: holder says located, no location lists it"
                    )));
                }
                Holder::Consumed | Holder::Discarded if slot.reserved_by.is_some() => {
                    return Err(SimError::invariant(format!(
                        "retired resource {i} still carries a reservation"
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
