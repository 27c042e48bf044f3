//! Top-level simulation lifecycle: store construction, seeding, process
//! registration, event-loop execution, metric extraction.

use fabrik_kernel::{DataBag, Scheduler, SimError, SimSummary, Store};
use fabrik_types::{KindId, LocationId, SimTime, days};
use tracing::debug;

use crate::metrics;
use crate::model::Model;
use crate::production::ProductionProcess;
use crate::shipping::ShippingProcess;

/// Default number of input components seeded into supply-chain roots.
pub const SEED_CAPACITY: u32 = 20_000;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for the deterministic RNG.
    pub seed: u64,
    /// Virtual-time deadline the run executes to.
    pub run_until: SimTime,
    /// Input components created per seed unit before the clock starts.
    pub seed_capacity: u32,
    /// Safety valve against runaway event loops.
    pub max_events: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            run_until: SimTime::ZERO + days(7),
            seed_capacity: SEED_CAPACITY,
            max_events: 10_000_000,
        }
    }
}

impl SimConfig {
    /// Creates a new configuration with the specified seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the run-until deadline.
    pub fn with_run_until(mut self, run_until: SimTime) -> Self {
        self.run_until = run_until;
        self
    }

    /// Sets how many input components seed units start with.
    pub fn with_seed_capacity(mut self, seed_capacity: u32) -> Self {
        self.seed_capacity = seed_capacity;
        self
    }

    /// Sets the maximum number of events to dispatch.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = max_events;
        self
    }
}

/// A model wired into a kernel scheduler, ready to run.
///
/// Construction builds the store (locations, links, kinds), seeds the
/// units' input locations before the clock advances from zero, declares
/// every metric key, and registers one production process per unit followed
/// by one shipping process per route. That order is the deterministic start
/// order.
pub struct Simulation {
    scheduler: Scheduler,
    model: Model,
    config: SimConfig,
}

impl Simulation {
    pub fn new(model: Model, config: SimConfig) -> Self {
        let mut scheduler = Scheduler::new(config.seed);

        {
            let store = scheduler.store_mut();
            for location in &model.locations {
                store.add_location(&location.name, location.capacity);
            }
            for &(from, to) in &model.links {
                store.link(from, to);
            }
            for component in &model.components {
                store.register_kind(&component.name, Some(component.origin));
            }
            for unit in &model.units {
                let primer = if unit.seed_unit {
                    config.seed_capacity
                } else {
                    unit.production_size
                };
                for &(kind, _) in &unit.inputs_needed {
                    store.seed(unit.input, kind, primer);
                }
            }
        }

        for key in metrics::ALL_KEYS {
            scheduler.data_mut().declare(key);
        }

        for unit in &model.units {
            scheduler.spawn(
                format!("production/{}", model.location_name(unit.input)),
                Box::new(ProductionProcess::new(unit)),
            );
        }
        for route in &model.routes {
            scheduler.spawn(
                format!("shipping/{}", route.id),
                Box::new(ShippingProcess::new(route, &model)),
            );
        }

        debug!(
            units = model.units.len(),
            routes = model.routes.len(),
            seed = config.seed,
            "simulation assembled"
        );

        Self {
            scheduler,
            model,
            config,
        }
    }

    /// Drive the event loop to the configured deadline.
    pub fn run(&mut self) -> Result<SimSummary, SimError> {
        self.scheduler
            .run(self.config.run_until, self.config.max_events)
    }

    pub fn data(&self) -> &DataBag {
        self.scheduler.data()
    }

    pub fn store(&self) -> &Store {
        self.scheduler.store()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Physical count of components of `kind` at `loc`, reserved included.
    /// Zero for unknown kind names.
    pub fn count_at(&self, loc: LocationId, kind: &str) -> usize {
        match self.store().kinds().lookup(kind) {
            Some(id) => self.store().count_of(loc, id),
            None => 0,
        }
    }

    /// Resources physically present at `loc`.
    pub fn occupancy(&self, loc: LocationId) -> usize {
        self.store().occupancy(loc)
    }

    /// Per-location multiset of kind counts, for replay comparison.
    pub fn location_multisets(&self) -> Vec<(String, Vec<(String, usize)>)> {
        let store = self.store();
        (0..store.locations_len())
            .map(|i| {
                let loc = LocationId::new(i as u32);
                let counts = (0..store.kinds().len())
                    .map(|k| {
                        let kind = KindId::new(k as u32);
                        (
                            store.kinds().name(kind).to_string(),
                            store.count_of(loc, kind),
                        )
                    })
                    .collect();
                (store.location(loc).name().to_string(), counts)
            })
            .collect()
    }
}

/// Build and run in one call, returning the finished simulation for
/// inspection of its `DataBag` and final location contents.
pub fn simulate(model: Model, config: SimConfig) -> Result<Simulation, SimError> {
    let mut sim = Simulation::new(model, config);
    let summary = sim.run()?;
    debug!(
        final_time = %summary.final_time,
        events = summary.events_dispatched,
        "simulation finished"
    );
    Ok(sim)
}
