//! Single-threaded cooperative scheduler over virtual time.
//!
//! The scheduler owns every piece of shared state (clock, event queue,
//! store, claim engine, RNG, metrics, processes) and is the only execution
//! context, so nothing needs a lock. It pops due events, resumes the
//! associated process until its next suspension, and turns the resulting
//! step into new events. All state changes between two clock ticks are
//! totally ordered by event sequence.

use fabrik_types::{KindId, LocationId, ProcId, ResourceId, SimTime};
use serde::Serialize;
use tracing::{debug, trace};

use crate::claim::{ClaimEngine, ClaimHandle, ClaimOutcome, GrantNotice, Predicate};
use crate::clock::SimClock;
use crate::databag::DataBag;
use crate::error::SimError;
use crate::event::{EventQueue, ScheduledEvent, WakeReason};
use crate::process::{ProcState, Process, Step, WaitKind, Wake};
use crate::rng::SimRng;
use crate::store::Store;

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The clock reached the run-until deadline.
    DeadlineReached,
    /// No events remained.
    QueueEmpty,
    /// The max-events safety valve tripped.
    EventLimit,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SimSummary {
    pub final_time: SimTime,
    pub events_dispatched: u64,
    pub termination: Termination,
}

struct ProcSlot {
    name: String,
    state: ProcState,
    body: Option<Box<dyn Process>>,
}

/// The event-loop driver.
pub struct Scheduler {
    clock: SimClock,
    queue: EventQueue,
    store: Store,
    claims: ClaimEngine,
    rng: SimRng,
    data: DataBag,
    procs: Vec<ProcSlot>,
    events_dispatched: u64,
    /// First event sequence belonging to the run-until instant; set when
    /// the clock reaches the deadline. Wake-ups scheduled at the deadline
    /// instant itself are left undispatched.
    deadline_seq: Option<u64>,
}

impl Scheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: SimClock::new(),
            queue: EventQueue::new(),
            store: Store::new(),
            claims: ClaimEngine::new(),
            rng: SimRng::new(seed),
            data: DataBag::new(),
            procs: Vec::new(),
            events_dispatched: 0,
            deadline_seq: None,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn data(&self) -> &DataBag {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBag {
        &mut self.data
    }

    pub fn claims(&self) -> &ClaimEngine {
        &self.claims
    }

    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }

    /// Register a process and schedule its start at the current instant.
    pub fn spawn(&mut self, name: impl Into<String>, body: Box<dyn Process>) -> ProcId {
        let pid = ProcId::new(self.procs.len() as u32);
        let name = name.into();
        self.queue.push(self.clock.now(), pid, WakeReason::Start);
        debug!(proc = %pid, name = %name, "process spawned");
        self.procs.push(ProcSlot {
            name,
            state: ProcState::Ready,
            body: Some(body),
        });
        pid
    }

    pub fn proc_state(&self, pid: ProcId) -> ProcState {
        self.procs[pid.index()].state
    }

    pub fn proc_name(&self, pid: ProcId) -> &str {
        &self.procs[pid.index()].name
    }

    /// Drive the event loop until `run_until`, queue exhaustion, or
    /// `max_events`.
    ///
    /// Events due exactly at `run_until` are dispatched when they were
    /// scheduled before the clock reached the deadline; wake-ups created at
    /// the deadline instant itself are not.
    pub fn run(&mut self, run_until: SimTime, max_events: u64) -> Result<SimSummary, SimError> {
        self.deadline_seq = None;
        let termination = loop {
            if self.events_dispatched >= max_events {
                break Termination::EventLimit;
            }
            let Some(next) = self.queue.peek() else {
                break Termination::QueueEmpty;
            };
            if next.due > run_until {
                self.clock.advance_to(run_until)?;
                break Termination::DeadlineReached;
            }
            if next.due == run_until {
                let boundary = match self.deadline_seq {
                    Some(boundary) => boundary,
                    None => {
                        let boundary = self.queue.next_seq();
                        self.deadline_seq = Some(boundary);
                        boundary
                    }
                };
                if u64::from(next.id) >= boundary {
                    self.clock.advance_to(run_until)?;
                    break Termination::DeadlineReached;
                }
            }
            self.clock.advance_to(next.due)?;
            let Some(event) = self.queue.pop() else {
                break Termination::QueueEmpty;
            };
            self.events_dispatched += 1;
            self.dispatch(event)?;
        };

        let summary = SimSummary {
            final_time: self.clock.now(),
            events_dispatched: self.events_dispatched,
            termination,
        };
        debug!(
            final_time = %summary.final_time,
            events = summary.events_dispatched,
            termination = ?summary.termination,
            "run finished"
        );
        Ok(summary)
    }

    fn dispatch(&mut self, event: ScheduledEvent) -> Result<(), SimError> {
        let pid = event.proc;
        let now = self.clock.now();
        trace!(event = %event.id, proc = %pid, at = %now, reason = ?event.reason, "dispatch");

        let wake = match event.reason {
            WakeReason::Start => Wake::Started,
            WakeReason::Timer => Wake::TimerElapsed,
            WakeReason::Grant(claim) => Wake::Granted(ClaimHandle::new(claim)),
            WakeReason::Deadline(claim) => {
                self.claims.cancel_parked(claim)?;
                Wake::DeadlineExpired
            }
        };

        let slot = self
            .procs
            .get_mut(pid.index())
            .ok_or_else(|| SimError::invariant(format!("wake for unknown process {pid}")))?;
        let Some(mut body) = slot.body.take() else {
            return Err(SimError::invariant(format!(
                "wake for completed process {pid}"
            )));
        };
        slot.state = ProcState::Running;

        let mut grants: Vec<GrantNotice> = Vec::new();
        let outcome = {
            let mut ctx = SimContext {
                now,
                store: &mut self.store,
                claims: &mut self.claims,
                rng: &mut self.rng,
                data: &mut self.data,
                grants: &mut grants,
            };
            body.resume(&mut ctx, wake)
        };
        self.procs[pid.index()].body = Some(body);

        // Deposits made during the step may have granted parked claims.
        // Their wake-ups land at the current instant, after this step.
        for grant in grants {
            if let Some(deadline_event) = grant.deadline_event {
                self.queue.cancel(deadline_event);
            }
            self.queue.push(now, grant.proc, WakeReason::Grant(grant.claim));
            self.procs[grant.proc.index()].state = ProcState::Ready;
        }

        match outcome? {
            Step::Hold(duration) => {
                self.queue.push(now + duration, pid, WakeReason::Timer);
                self.procs[pid.index()].state = ProcState::Waiting(WaitKind::Hold);
            }
            Step::Claim {
                requirement,
                deadline,
            } => match self.claims.submit(pid, requirement, &mut self.store)? {
                ClaimOutcome::Granted(handle) => {
                    self.queue.push(now, pid, WakeReason::Grant(handle.id()));
                    self.procs[pid.index()].state = ProcState::Ready;
                }
                ClaimOutcome::Parked(claim) => {
                    self.procs[pid.index()].state = ProcState::Waiting(WaitKind::Claim);
                    if let Some(duration) = deadline {
                        let event_id =
                            self.queue
                                .push(now + duration, pid, WakeReason::Deadline(claim));
                        self.claims.attach_deadline(claim, event_id);
                    }
                }
            },
            Step::Done => {
                self.procs[pid.index()].body = None;
                self.procs[pid.index()].state = ProcState::Done;
                debug!(proc = %pid, "process completed");
            }
        }
        Ok(())
    }
}

/// Capabilities available to a process while it runs.
///
/// Every operation here completes without virtual time passing. Deposits
/// notify the claim engine before the call returns, so parked claims see
/// new resources before the scheduler returns to the event queue.
pub struct SimContext<'a> {
    now: SimTime,
    store: &'a mut Store,
    claims: &'a mut ClaimEngine,
    rng: &'a mut SimRng,
    data: &'a mut DataBag,
    grants: &'a mut Vec<GrantNotice>,
}

impl SimContext<'_> {
    /// Current virtual time. Stable for the whole step.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// A uniform draw from `[0, 1)`.
    pub fn draw_factor(&mut self) -> f64 {
        self.rng.factor()
    }

    /// Add `delta` to the named metric counter.
    pub fn metric(&mut self, key: &str, delta: u64) {
        self.data.add(key, delta);
    }

    pub fn data(&self) -> &DataBag {
        self.data
    }

    /// Resources physically present at `loc`, reserved ones included.
    pub fn occupancy(&self, loc: LocationId) -> usize {
        self.store.occupancy(loc)
    }

    /// Unreserved resources at `loc` matching `predicate`.
    pub fn available(&self, loc: LocationId, predicate: &Predicate) -> usize {
        self.store.available(loc, predicate)
    }

    /// Create a fresh component of `kind` in `loc` (capacity-checked) and
    /// notify watchers of the deposit.
    pub fn create(&mut self, loc: LocationId, kind: KindId) -> Result<ResourceId, SimError> {
        let id = self.store.create_into(loc, kind)?;
        self.notify(loc);
        Ok(id)
    }

    /// Withdraw and consume the resources of a granted claim. Returns how
    /// many were consumed.
    pub fn consume(&mut self, handle: ClaimHandle) -> Result<usize, SimError> {
        self.claims.consume(handle, self.store)
    }

    /// Move a granted claim's resources into `to` (link- and
    /// capacity-checked), consuming the handle. Watchers of `to` are
    /// notified.
    pub fn move_claim(&mut self, handle: ClaimHandle, to: LocationId) -> Result<usize, SimError> {
        let moved = self.claims.transfer(handle, to, self.store)?;
        self.notify(to);
        Ok(moved)
    }

    /// Put a granted claim's resources back: in place when `to` is `None`,
    /// otherwise into the given location. Freed availability re-triggers
    /// parked claims either way.
    pub fn release(&mut self, handle: ClaimHandle, to: Option<LocationId>) -> Result<(), SimError> {
        let freed = self.claims.release(handle, to, self.store)?;
        for loc in freed {
            self.notify(loc);
        }
        Ok(())
    }

    /// Withdraw up to `count` available matching resources at `loc` and
    /// discard them (the defect path). Returns how many were taken.
    pub fn discard(
        &mut self,
        loc: LocationId,
        predicate: &Predicate,
        count: u32,
    ) -> Result<u32, SimError> {
        self.store.discard_available(loc, predicate, count)
    }

    fn notify(&mut self, loc: LocationId) {
        let new_grants = self.claims.notify_deposit(loc, self.store);
        self.grants.extend(new_grants);
    }
}
