//! Atomic multi-location resource claims.
//!
//! A claim is a conjunction of atoms "count resources at location matching
//! predicate", granted all-or-nothing. Unsatisfiable claims park with a
//! watch on every location they mention and are retried, FIFO by park
//! sequence, on each deposit to a watched location. Granted claims hold
//! their resources through in-place reservations until consumed, moved or
//! released.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use fabrik_types::{ClaimId, EventId, KindId, LocationId, ProcId, ResourceId};
use tracing::{debug, trace};

use crate::error::SimError;
use crate::store::Store;

/// Selects which resources an atom may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Any resource.
    Any,
    /// Resources of one kind.
    Kind(KindId),
}

impl Predicate {
    pub fn matches(&self, kind: KindId) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Kind(wanted) => *wanted == kind,
        }
    }
}

/// One conjunct of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimAtom {
    pub location: LocationId,
    pub predicate: Predicate,
    pub count: u32,
}

/// A conjunction of atoms, claimed atomically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Requirement {
    atoms: Vec<ClaimAtom>,
}

impl Requirement {
    pub fn new() -> Self {
        Self::default()
    }

    /// A requirement of a single atom.
    pub fn atom(location: LocationId, predicate: Predicate, count: u32) -> Self {
        Self::new().and(location, predicate, count)
    }

    /// Append a further atom to the conjunction.
    pub fn and(mut self, location: LocationId, predicate: Predicate, count: u32) -> Self {
        self.atoms.push(ClaimAtom {
            location,
            predicate,
            count,
        });
        self
    }

    pub fn atoms(&self) -> &[ClaimAtom] {
        &self.atoms
    }

    /// The distinct locations this requirement depends on.
    pub fn locations(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.atoms
            .iter()
            .map(|atom| atom.location)
            .collect::<BTreeSet<_>>()
            .into_iter()
    }
}

/// Token for a granted claim. Consumed by exactly one of `consume`,
/// `move_claim` or `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimHandle(ClaimId);

impl ClaimHandle {
    pub(crate) fn new(id: ClaimId) -> Self {
        Self(id)
    }

    pub fn id(self) -> ClaimId {
        self.0
    }
}

/// Result of submitting a claim. Parking is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Granted(ClaimHandle),
    Parked(ClaimId),
}

/// A grant produced while retrying parked claims after a deposit.
#[derive(Debug, Clone, Copy)]
pub struct GrantNotice {
    pub proc: ProcId,
    pub claim: ClaimId,
    /// Deadline event to cancel, when the claim was submitted with one.
    pub deadline_event: Option<EventId>,
}

#[derive(Debug)]
struct ParkedClaim {
    claim: ClaimId,
    proc: ProcId,
    requirement: Requirement,
    deadline_event: Option<EventId>,
}

#[derive(Debug)]
struct GrantedClaim {
    selected: Vec<(LocationId, ResourceId)>,
}

/// The claim engine: reservation bookkeeping plus the park/notify machinery.
#[derive(Debug, Default)]
pub struct ClaimEngine {
    next_claim: u64,
    next_park: u64,
    granted: HashMap<ClaimId, GrantedClaim>,
    /// Parked claims in park order. FIFO by park sequence is the fairness
    /// guarantee.
    parked: BTreeMap<u64, ParkedClaim>,
    park_of: HashMap<ClaimId, u64>,
    watches: HashMap<LocationId, BTreeSet<u64>>,
}

impl ClaimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to grant `requirement` now; park on failure.
    pub fn submit(
        &mut self,
        proc: ProcId,
        requirement: Requirement,
        store: &mut Store,
    ) -> Result<ClaimOutcome, SimError> {
        let claim = ClaimId::new(self.next_claim);
        self.next_claim += 1;

        match store.reserve_requirement(claim, &requirement) {
            Ok(selected) => {
                trace!(%claim, %proc, resources = selected.len(), "claim granted");
                self.granted.insert(claim, GrantedClaim { selected });
                Ok(ClaimOutcome::Granted(ClaimHandle::new(claim)))
            }
            Err(blocked) => {
                trace!(%claim, %proc, atom = blocked.atom, missing = blocked.missing, "claim parked");
                let seq = self.next_park;
                self.next_park += 1;
                for location in requirement.locations() {
                    self.watches.entry(location).or_default().insert(seq);
                }
                self.parked.insert(
                    seq,
                    ParkedClaim {
                        claim,
                        proc,
                        requirement,
                        deadline_event: None,
                    },
                );
                self.park_of.insert(claim, seq);
                Ok(ClaimOutcome::Parked(claim))
            }
        }
    }

    /// Remember the deadline event of a parked claim so a grant can cancel
    /// it.
    pub fn attach_deadline(&mut self, claim: ClaimId, event: EventId) {
        if let Some(&seq) = self.park_of.get(&claim) {
            if let Some(parked) = self.parked.get_mut(&seq) {
                parked.deadline_event = Some(event);
            }
        }
    }

    /// Cancel a parked claim. Parked claims hold no reservations, so there
    /// is nothing to put back.
    pub fn cancel_parked(&mut self, claim: ClaimId) -> Result<(), SimError> {
        let Some(seq) = self.park_of.remove(&claim) else {
            return Err(SimError::invariant(format!(
                "cancel of claim {claim} which is not parked"
            )));
        };
        if let Some(parked) = self.parked.remove(&seq) {
            self.unwatch(seq, &parked.requirement);
            debug!(%claim, proc = %parked.proc, "parked claim cancelled");
        }
        Ok(())
    }

    /// Retry the claims watching `location` after a deposit there, FIFO by
    /// park sequence. Each grant reserves immediately, so later claims are
    /// evaluated against the post-grant state.
    pub fn notify_deposit(&mut self, location: LocationId, store: &mut Store) -> Vec<GrantNotice> {
        let candidates: Vec<u64> = match self.watches.get(&location) {
            Some(watchers) => watchers.iter().copied().collect(),
            None => return Vec::new(),
        };

        let mut grants = Vec::new();
        for seq in candidates {
            let Some(parked) = self.parked.get(&seq) else {
                continue;
            };
            let claim = parked.claim;
            match store.reserve_requirement(claim, &parked.requirement) {
                Ok(selected) => {
                    let Some(parked) = self.parked.remove(&seq) else {
                        continue;
                    };
                    self.park_of.remove(&parked.claim);
                    self.unwatch(seq, &parked.requirement);
                    debug!(%claim, proc = %parked.proc, "parked claim granted after deposit");
                    self.granted.insert(claim, GrantedClaim { selected });
                    grants.push(GrantNotice {
                        proc: parked.proc,
                        claim,
                        deadline_event: parked.deadline_event,
                    });
                }
                Err(_) => {}
            }
        }
        grants
    }

    fn unwatch(&mut self, seq: u64, requirement: &Requirement) {
        for location in requirement.locations() {
            if let Some(watchers) = self.watches.get_mut(&location) {
                watchers.remove(&seq);
                if watchers.is_empty() {
                    self.watches.remove(&location);
                }
            }
        }
    }

    /// Withdraw and consume the resources of a granted claim. Returns how
    /// many were consumed.
    pub fn consume(&mut self, handle: ClaimHandle, store: &mut Store) -> Result<usize, SimError> {
        let granted = self.take_granted(handle)?;
        store.consume_reserved(handle.id(), &granted.selected)?;
        Ok(granted.selected.len())
    }

    /// Withdraw the resources of a granted claim and deposit them into `to`
    /// (link- and capacity-checked). Returns how many moved.
    pub fn transfer(
        &mut self,
        handle: ClaimHandle,
        to: LocationId,
        store: &mut Store,
    ) -> Result<usize, SimError> {
        let granted = self.take_granted(handle)?;
        store.move_reserved(handle.id(), &granted.selected, to)?;
        Ok(granted.selected.len())
    }

    /// Release a granted claim: clear reservations in place, or deposit the
    /// resources into an explicit location. Returns the locations whose
    /// availability grew.
    pub fn release(
        &mut self,
        handle: ClaimHandle,
        to: Option<LocationId>,
        store: &mut Store,
    ) -> Result<Vec<LocationId>, SimError> {
        let granted = self.take_granted(handle)?;
        match to {
            None => {
                store.unreserve_all(handle.id(), &granted.selected)?;
                let mut sources: Vec<LocationId> = Vec::new();
                for &(loc, _) in &granted.selected {
                    if !sources.contains(&loc) {
                        sources.push(loc);
                    }
                }
                Ok(sources)
            }
            Some(loc) => {
                store.relocate_reserved(handle.id(), &granted.selected, loc)?;
                Ok(vec![loc])
            }
        }
    }

    fn take_granted(&mut self, handle: ClaimHandle) -> Result<GrantedClaim, SimError> {
        self.granted.remove(&handle.id()).ok_or_else(|| {
            SimError::invariant(format!(
                "claim handle {} already consumed or never granted",
                handle.id()
            ))
        })
    }

    /// Number of claims currently parked.
    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    /// Number of granted claims whose handles are still outstanding.
    pub fn outstanding_len(&self) -> usize {
        self.granted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> (Store, LocationId, KindId) {
        let mut store = Store::new();
        let depot = store.add_location("depot", None);
        let widget = store.register_kind("widget", Some(depot));
        (store, depot, widget)
    }

    fn deposit(store: &mut Store, loc: LocationId, kind: KindId, n: u32) {
        for _ in 0..n {
            store.create_into(loc, kind).expect("create");
        }
    }

    #[test]
    fn immediate_grant_when_satisfiable() {
        let (mut store, depot, widget) = arena();
        deposit(&mut store, depot, widget, 3);

        let mut engine = ClaimEngine::new();
        let outcome = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 2),
                &mut store,
            )
            .expect("submit");

        let ClaimOutcome::Granted(handle) = outcome else {
            panic!("expected grant, got {outcome:?}");
        };
        assert_eq!(store.available(depot, &Predicate::Kind(widget)), 1);

        let consumed = engine.consume(handle, &mut store).expect("consume");
        assert_eq!(consumed, 2);
        assert_eq!(store.occupancy(depot), 1);
    }

    #[test]
    fn unsatisfiable_claim_parks() {
        let (mut store, depot, widget) = arena();
        let mut engine = ClaimEngine::new();

        let outcome = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 1),
                &mut store,
            )
            .expect("submit");
        assert!(matches!(outcome, ClaimOutcome::Parked(_)));
        assert_eq!(engine.parked_len(), 1);
    }

    #[test]
    fn deposits_wake_parked_claims_fifo() {
        let (mut store, depot, widget) = arena();
        let mut engine = ClaimEngine::new();

        let first = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 1),
                &mut store,
            )
            .expect("submit");
        let second = engine
            .submit(
                ProcId::new(1),
                Requirement::atom(depot, Predicate::Kind(widget), 1),
                &mut store,
            )
            .expect("submit");
        assert!(matches!(first, ClaimOutcome::Parked(_)));
        assert!(matches!(second, ClaimOutcome::Parked(_)));

        deposit(&mut store, depot, widget, 1);
        let grants = engine.notify_deposit(depot, &mut store);

        // Only the earlier parker gets the single widget.
        assert_eq!(grants.len(), 1);
        assert_eq!(u32::from(grants[0].proc), 0);
        assert_eq!(engine.parked_len(), 1);

        // A second deposit satisfies the straggler.
        deposit(&mut store, depot, widget, 1);
        let grants = engine.notify_deposit(depot, &mut store);
        assert_eq!(grants.len(), 1);
        assert_eq!(u32::from(grants[0].proc), 1);
        assert_eq!(engine.parked_len(), 0);
    }

    #[test]
    fn one_deposit_may_wake_several_claims() {
        let (mut store, depot, widget) = arena();
        let mut engine = ClaimEngine::new();

        for proc in 0..2 {
            engine
                .submit(
                    ProcId::new(proc),
                    Requirement::atom(depot, Predicate::Kind(widget), 1),
                    &mut store,
                )
                .expect("submit");
        }

        deposit(&mut store, depot, widget, 2);
        let grants = engine.notify_deposit(depot, &mut store);
        assert_eq!(grants.len(), 2);
        assert_eq!(u32::from(grants[0].proc), 0);
        assert_eq!(u32::from(grants[1].proc), 1);
    }

    #[test]
    fn multi_atom_claims_are_all_or_nothing() {
        let (mut store, depot, widget) = arena();
        let annex = store.add_location("annex", None);
        deposit(&mut store, depot, widget, 5);

        let mut engine = ClaimEngine::new();
        let requirement = Requirement::atom(depot, Predicate::Kind(widget), 2).and(
            annex,
            Predicate::Kind(widget),
            1,
        );
        let outcome = engine
            .submit(ProcId::new(0), requirement, &mut store)
            .expect("submit");

        assert!(matches!(outcome, ClaimOutcome::Parked(_)));
        // Nothing stays reserved at the depot.
        assert_eq!(store.available(depot, &Predicate::Kind(widget)), 5);

        // Depositing at the annex completes the conjunction.
        deposit(&mut store, annex, widget, 1);
        let grants = engine.notify_deposit(annex, &mut store);
        assert_eq!(grants.len(), 1);
        assert_eq!(store.available(depot, &Predicate::Kind(widget)), 3);
        assert_eq!(store.available(annex, &Predicate::Kind(widget)), 0);
    }

    #[test]
    fn claim_then_release_leaves_locations_identical() {
        let (mut store, depot, widget) = arena();
        deposit(&mut store, depot, widget, 4);
        let before: Vec<_> = store.location(depot).contents().collect();

        let mut engine = ClaimEngine::new();
        let outcome = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 3),
                &mut store,
            )
            .expect("submit");
        let ClaimOutcome::Granted(handle) = outcome else {
            panic!("expected grant");
        };

        let freed = engine.release(handle, None, &mut store).expect("release");
        assert_eq!(freed, vec![depot]);
        assert_eq!(store.location(depot).contents().collect::<Vec<_>>(), before);
        store.audit().expect("identical after cancel");
    }

    #[test]
    fn stale_handles_are_rejected() {
        let (mut store, depot, widget) = arena();
        deposit(&mut store, depot, widget, 1);

        let mut engine = ClaimEngine::new();
        let ClaimOutcome::Granted(handle) = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 1),
                &mut store,
            )
            .expect("submit")
        else {
            panic!("expected grant");
        };

        engine.consume(handle, &mut store).expect("first use");
        let err = engine.consume(handle, &mut store).unwrap_err();
        assert!(matches!(err, SimError::Invariant { .. }));
    }

    #[test]
    fn cancelled_parked_claim_no_longer_watches() {
        let (mut store, depot, widget) = arena();
        let mut engine = ClaimEngine::new();

        let ClaimOutcome::Parked(claim) = engine
            .submit(
                ProcId::new(0),
                Requirement::atom(depot, Predicate::Kind(widget), 1),
                &mut store,
            )
            .expect("submit")
        else {
            panic!("expected park");
        };

        engine.cancel_parked(claim).expect("cancel");
        assert_eq!(engine.parked_len(), 0);

        deposit(&mut store, depot, widget, 1);
        assert!(engine.notify_deposit(depot, &mut store).is_empty());
    }
}
