//! Supply-chain model: components, manufacturing units, shipping routes.
//!
//! The `*Spec` types are what callers hand to the builder; the `*Def` types
//! are the validated, kind-resolved forms the simulation runs on.

use std::collections::BTreeMap;

use fabrik_types::{KindId, LocationId, RouteId, SimDuration, UnitId};

/// A component kind and the location where it is produced.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: String,
    pub origin: LocationId,
}

/// Parameters of a manufacturing unit, as supplied to the builder.
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub input: LocationId,
    pub output: LocationId,
    /// Component name -> count consumed per production cycle.
    pub inputs_needed: BTreeMap<String, u32>,
    pub production_time: SimDuration,
    /// Components produced per cycle.
    pub production_size: u32,
    /// Fraction of each shipped batch discarded before transit, in `[0, 1)`.
    pub defect_rate: f64,
    /// Probability boundary for stochastic shipping delays, in `[0, 1)`.
    pub shipping_delay_threshold: f64,
    pub input_cap: u32,
    pub output_cap: u32,
    /// Supply-chain roots get seeded with `seed_capacity` input components.
    pub seed_unit: bool,
}

/// A validated manufacturing unit with resolved kind ids.
#[derive(Debug, Clone)]
pub struct UnitDef {
    pub id: UnitId,
    pub input: LocationId,
    pub output: LocationId,
    pub inputs_needed: Vec<(KindId, u32)>,
    pub production_time: SimDuration,
    pub production_size: u32,
    pub defect_rate: f64,
    pub shipping_delay_threshold: f64,
    pub input_cap: u32,
    pub output_cap: u32,
    pub seed_unit: bool,
    /// The kind this unit manufactures: the unique component kind
    /// originating at its input location.
    pub product: KindId,
    /// No route ships from this unit; its production is the chain's final
    /// output.
    pub is_final: bool,
}

/// Parameters of a shipping route, as supplied to the builder.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub supplier: UnitId,
    /// Receiver unit -> base transport time.
    pub receivers: BTreeMap<UnitId, SimDuration>,
    pub batch_size: u32,
    /// Name of the component kind this route ships.
    pub component: String,
}

/// A validated shipping route.
#[derive(Debug, Clone)]
pub struct RouteDef {
    pub id: RouteId,
    pub supplier: UnitId,
    /// Receivers in ascending unit-id order; served round-robin.
    pub receivers: Vec<(UnitId, SimDuration)>,
    pub batch_size: u32,
    pub kind: KindId,
}

#[derive(Debug, Clone)]
pub(crate) struct LocationDef {
    pub name: String,
    /// Storage cap when the location is a unit's input or output.
    pub capacity: Option<u32>,
}

/// A validated model, ready to simulate.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) locations: Vec<LocationDef>,
    pub(crate) links: Vec<(LocationId, LocationId)>,
    /// Index position doubles as the kernel `KindId`.
    pub(crate) components: Vec<ComponentSpec>,
    pub(crate) units: Vec<UnitDef>,
    pub(crate) routes: Vec<RouteDef>,
}

impl Model {
    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    pub fn unit(&self, id: UnitId) -> &UnitDef {
        &self.units[id.index()]
    }

    pub fn location_name(&self, id: LocationId) -> &str {
        &self.locations[id.index()].name
    }

    pub fn location_capacity(&self, id: LocationId) -> Option<u32> {
        self.locations[id.index()].capacity
    }

    pub fn find_location(&self, name: &str) -> Option<LocationId> {
        self.locations
            .iter()
            .position(|loc| loc.name == name)
            .map(|i| LocationId::new(i as u32))
    }
}
