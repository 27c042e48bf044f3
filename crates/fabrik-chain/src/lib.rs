//! # fabrik-chain: Supply-chain layer over the fabrik kernel
//!
//! Models multi-stage supply chains built from manufacturing units that
//! produce, consume, store, and ship typed components over linked
//! locations:
//!
//! - [`ModelBuilder`] assembles locations, links, components,
//!   [`UnitSpec`]s and [`RouteSpec`]s into a validated [`Model`]
//!   (structural problems surface as [`ConfigError`]).
//! - [`ProductionProcess`] and [`ShippingProcess`] are the two process
//!   state machines layered on the kernel's claim protocol.
//! - [`Simulation`] seeds the chain, registers the processes and drives
//!   the run; [`simulate`] is the one-call wrapper.
//! - [`metrics`] lists the counter keys written to the `DataBag`.
//!
//! ## Example
//!
//! ```
//! use fabrik_chain::{ModelBuilder, SimConfig, UnitSpec, simulate};
//! use fabrik_types::{SimTime, hours};
//! use std::collections::BTreeMap;
//!
//! let mut builder = ModelBuilder::new();
//! let input = builder.location("mill.input");
//! let output = builder.location("mill.output");
//! builder.component("plank", input);
//!
//! builder.unit(UnitSpec {
//!     input,
//!     output,
//!     inputs_needed: BTreeMap::from([("plank".to_string(), 1)]),
//!     production_time: hours(1),
//!     production_size: 4,
//!     defect_rate: 0.0,
//!     shipping_delay_threshold: 0.9,
//!     input_cap: 100,
//!     output_cap: 100,
//!     seed_unit: true,
//! });
//!
//! let model = builder.build().expect("valid model");
//! let config = SimConfig::default()
//!     .with_seed_capacity(20)
//!     .with_run_until(SimTime::ZERO + hours(5));
//! let sim = simulate(model, config).expect("run succeeds");
//! assert_eq!(sim.data().get("total_final_output"), 20);
//! ```

mod builder;
mod error;
pub mod metrics;
mod model;
mod production;
mod shipping;
mod simulation;

pub use builder::ModelBuilder;
pub use error::ConfigError;
pub use model::{ComponentSpec, Model, RouteDef, RouteSpec, UnitDef, UnitSpec};
pub use production::ProductionProcess;
pub use shipping::ShippingProcess;
pub use simulation::{SEED_CAPACITY, SimConfig, Simulation, simulate};
