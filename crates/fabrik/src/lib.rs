//! # Fabrik
//!
//! Discrete-event simulation of multi-stage supply chains.
//!
//! Fabrik models manufacturing units that produce, consume, store, and
//! ship typed components over weighted transport links, driven by a
//! single-threaded cooperative scheduler over virtual time.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           Fabrik                              │
//! │  ┌──────────┐   ┌─────────────────┐   ┌────────────────────┐  │
//! │  │  Model   │ → │     Kernel      │ → │      DataBag       │  │
//! │  │ (builder)│   │ clock · events  │   │  (metric counters) │  │
//! │  │          │   │ claims · procs  │   │                    │  │
//! │  └──────────┘   └─────────────────┘   └────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use fabrik::{ModelBuilder, SimConfig, SimTime, UnitSpec, hours, simulate};
//! use std::collections::BTreeMap;
//!
//! // A single seeded unit turning raw widgets into finished widgets.
//! let mut builder = ModelBuilder::new();
//! let input = builder.location("mill.input");
//! let output = builder.location("mill.output");
//! builder.component("widget", input);
//! builder.unit(UnitSpec {
//!     input,
//!     output,
//!     inputs_needed: BTreeMap::from([("widget".to_string(), 1)]),
//!     production_time: hours(1),
//!     production_size: 10,
//!     defect_rate: 0.0,
//!     shipping_delay_threshold: 0.9,
//!     input_cap: 100,
//!     output_cap: 100,
//!     seed_unit: true,
//! });
//! let model = builder.build()?;
//!
//! let config = SimConfig::default()
//!     .with_seed(0)
//!     .with_seed_capacity(20)
//!     .with_run_until(SimTime::ZERO + hours(5));
//! let sim = simulate(model, config)?;
//!
//! assert_eq!(sim.data().get("total_final_output"), 50);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Layers
//!
//! - **Types**: shared ids and virtual-time arithmetic
//! - **Kernel**: clock, event queue, claim engine, cooperative scheduler
//! - **Chain**: units, routes, model assembly, the simulation front end

// Re-export the supply-chain layer - main API
pub use fabrik_chain::{
    ComponentSpec, ConfigError, Model, ModelBuilder, ProductionProcess, RouteDef, RouteSpec,
    SEED_CAPACITY, ShippingProcess, SimConfig, Simulation, UnitDef, UnitSpec, metrics, simulate,
};

// Re-export the kernel surface
pub use fabrik_kernel::{
    ClaimAtom, ClaimEngine, ClaimHandle, ClaimOutcome, DataBag, EventQueue, Holder, KindRegistry,
    Location, Predicate, ProcState, Process, Requirement, ResourceIndex, Scheduler, SimClock,
    SimContext, SimError, SimRng, SimSummary, Step, Store, Termination, WaitKind, Wake,
};

// Re-export core types
pub use fabrik_types::{
    ClaimId, EventId, KindId, LocationId, ProcId, ResourceId, RouteId, SimDuration, SimTime,
    UnitId, days, hours, seconds,
};
