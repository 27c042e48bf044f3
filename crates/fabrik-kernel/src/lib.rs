//! # fabrik-kernel: Discrete-event simulation kernel
//!
//! A single-threaded cooperative scheduler over virtual time, together with
//! the resource-claim protocol that coordinates long-running processes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Scheduler                              │
//! │  ┌───────────┐   ┌──────────────┐   ┌────────────────────────┐  │
//! │  │ SimClock  │   │ EventQueue   │   │ SimRng (deterministic) │  │
//! │  │ (discrete)│   │ (time, seq)  │   │                        │  │
//! │  └───────────┘   └──────────────┘   └────────────────────────┘  │
//! │                                                                  │
//! │  ┌────────────────────────────┐   ┌───────────────────────────┐ │
//! │  │ Store                      │   │ ClaimEngine               │ │
//! │  │ Locations · ResourceIndex  │◄──┤ reserve / park / notify   │ │
//! │  │ resource arena · links     │   │ FIFO by park sequence     │ │
//! │  └────────────────────────────┘   └───────────────────────────┘ │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ Processes: resumable state machines (hold / claim / done)  │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Reproducibility**: same seed, same inputs, same committed state
//!   transitions. Ties in the event queue break by insertion sequence and
//!   every stochastic decision flows through the seeded [`SimRng`].
//! - **Atomic claims**: a claim's atoms are granted all-or-nothing; no
//!   resource is ever promised to two claims.
//! - **FIFO fairness**: parked claims are retried in park order on every
//!   deposit to a watched location.
//! - **No time inside a step**: a process runs to its next suspension with
//!   the clock frozen; deposits it makes are visible to the claim engine
//!   before the scheduler returns to the event queue.

mod claim;
mod clock;
mod databag;
mod error;
mod event;
mod location;
mod process;
mod resource;
mod rng;
mod scheduler;
mod store;

pub use claim::{
    ClaimAtom, ClaimEngine, ClaimHandle, ClaimOutcome, GrantNotice, Predicate, Requirement,
};
pub use clock::SimClock;
pub use databag::DataBag;
pub use error::SimError;
pub use event::{EventQueue, ScheduledEvent, WakeReason};
pub use location::{Location, ResourceIndex};
pub use process::{ProcState, Process, Step, WaitKind, Wake};
pub use resource::{Holder, KindEntry, KindRegistry, ResourceSlot};
pub use rng::SimRng;
pub use scheduler::{Scheduler, SimContext, SimSummary, Termination};
pub use store::{BlockedAtom, Insufficient, Store};
