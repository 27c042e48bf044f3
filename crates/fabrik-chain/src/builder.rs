//! Model assembly and validation.

use std::collections::{BTreeSet, HashMap, HashSet};

use fabrik_types::{KindId, LocationId, RouteId, UnitId};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::{ComponentSpec, LocationDef, Model, RouteDef, RouteSpec, UnitDef, UnitSpec};

/// Assembles locations, links, components, units and routes into a
/// validated [`Model`].
///
/// Handles returned from the `location`/`unit`/`route` methods are plain
/// ids; all structural checking happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ModelBuilder {
    locations: Vec<String>,
    links: BTreeSet<(LocationId, LocationId)>,
    components: Vec<ComponentSpec>,
    units: Vec<UnitSpec>,
    routes: Vec<RouteSpec>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named location.
    pub fn location(&mut self, name: &str) -> LocationId {
        let id = LocationId::new(self.locations.len() as u32);
        self.locations.push(name.to_string());
        id
    }

    /// Add a directed edge `from -> to`. Idempotent.
    pub fn link(&mut self, from: LocationId, to: LocationId) {
        self.links.insert((from, to));
    }

    /// Declare a component kind produced at `origin`.
    pub fn component(&mut self, name: &str, origin: LocationId) {
        self.components.push(ComponentSpec {
            name: name.to_string(),
            origin,
        });
    }

    /// Declare a manufacturing unit. Its input and output locations are
    /// linked implicitly.
    pub fn unit(&mut self, spec: UnitSpec) -> UnitId {
        let id = UnitId::new(self.units.len() as u32);
        self.links.insert((spec.input, spec.output));
        self.units.push(spec);
        id
    }

    /// Declare a shipping route. The supplier-output to receiver-input
    /// links must already exist.
    pub fn route(&mut self, spec: RouteSpec) -> RouteId {
        let id = RouteId::new(self.routes.len() as u32);
        self.routes.push(spec);
        id
    }

    /// Validate every structural invariant and produce the model.
    pub fn build(self) -> Result<Model, ConfigError> {
        let mut seen_names: HashSet<&str> = HashSet::new();
        for name in &self.locations {
            if !seen_names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateLocation(name.clone()));
            }
        }

        let mut kinds: HashMap<&str, KindId> = HashMap::new();
        for (i, component) in self.components.iter().enumerate() {
            if kinds
                .insert(component.name.as_str(), KindId::new(i as u32))
                .is_some()
            {
                return Err(ConfigError::DuplicateComponent(component.name.clone()));
            }
        }

        // Storage caps attach to locations; a location can serve one unit.
        let mut capacities: HashMap<LocationId, u32> = HashMap::new();
        let mut assign_cap = |loc: LocationId, cap: u32| -> Result<(), ConfigError> {
            if capacities.insert(loc, cap).is_some() {
                return Err(ConfigError::CapacityConflict {
                    location: self.locations[loc.index()].clone(),
                });
            }
            Ok(())
        };

        let mut units: Vec<UnitDef> = Vec::with_capacity(self.units.len());
        for (i, spec) in self.units.iter().enumerate() {
            let id = UnitId::new(i as u32);
            if spec.inputs_needed.is_empty() {
                return Err(ConfigError::EmptyInputs { unit: id });
            }
            let mut inputs_needed = Vec::with_capacity(spec.inputs_needed.len());
            for (name, &count) in &spec.inputs_needed {
                let Some(&kind) = kinds.get(name.as_str()) else {
                    return Err(ConfigError::UnknownComponent {
                        unit: id,
                        name: name.clone(),
                    });
                };
                if count == 0 {
                    return Err(ConfigError::ZeroInputCount {
                        unit: id,
                        name: name.clone(),
                    });
                }
                inputs_needed.push((kind, count));
            }
            if spec.production_size == 0 {
                return Err(ConfigError::ZeroProductionSize { unit: id });
            }
            for (what, value) in [
                ("defect rate", spec.defect_rate),
                ("shipping delay threshold", spec.shipping_delay_threshold),
            ] {
                if !(0.0..1.0).contains(&value) {
                    return Err(ConfigError::RateOutOfRange {
                        unit: id,
                        what,
                        value,
                    });
                }
            }
            if spec.input_cap == 0 {
                return Err(ConfigError::ZeroCapacity {
                    unit: id,
                    what: "input",
                });
            }
            if spec.output_cap == 0 {
                return Err(ConfigError::ZeroCapacity {
                    unit: id,
                    what: "output",
                });
            }
            assign_cap(spec.input, spec.input_cap)?;
            assign_cap(spec.output, spec.output_cap)?;

            // The unit's product is the unique kind originating at its
            // input location.
            let mut products = self
                .components
                .iter()
                .enumerate()
                .filter(|(_, c)| c.origin == spec.input)
                .map(|(k, _)| KindId::new(k as u32));
            let product = products
                .next()
                .ok_or(ConfigError::NoProducibleComponent { unit: id })?;
            if products.next().is_some() {
                return Err(ConfigError::AmbiguousProduct { unit: id });
            }

            units.push(UnitDef {
                id,
                input: spec.input,
                output: spec.output,
                inputs_needed,
                production_time: spec.production_time,
                production_size: spec.production_size,
                defect_rate: spec.defect_rate,
                shipping_delay_threshold: spec.shipping_delay_threshold,
                input_cap: spec.input_cap,
                output_cap: spec.output_cap,
                seed_unit: spec.seed_unit,
                product,
                // Routes are validated below; finality is patched there.
                is_final: true,
            });
        }

        let mut routes: Vec<RouteDef> = Vec::with_capacity(self.routes.len());
        for (i, spec) in self.routes.iter().enumerate() {
            let id = RouteId::new(i as u32);
            if spec.batch_size == 0 {
                return Err(ConfigError::ZeroBatchSize { route: id });
            }
            if spec.receivers.is_empty() {
                return Err(ConfigError::NoReceivers { route: id });
            }
            let Some(&kind) = kinds.get(spec.component.as_str()) else {
                return Err(ConfigError::UnknownRouteKind {
                    route: id,
                    name: spec.component.clone(),
                });
            };
            let supplier = units
                .get(spec.supplier.index())
                .ok_or(ConfigError::UnknownUnit {
                    route: id,
                    unit: spec.supplier,
                })?
                .clone();

            let mut receivers = Vec::with_capacity(spec.receivers.len());
            for (&receiver_id, &transport) in &spec.receivers {
                let receiver =
                    units
                        .get(receiver_id.index())
                        .ok_or(ConfigError::UnknownUnit {
                            route: id,
                            unit: receiver_id,
                        })?;
                if !self.links.contains(&(supplier.output, receiver.input)) {
                    return Err(ConfigError::MissingLink {
                        route: id,
                        from: self.locations[supplier.output.index()].clone(),
                        to: self.locations[receiver.input.index()].clone(),
                    });
                }
                receivers.push((receiver_id, transport));
            }

            units[spec.supplier.index()].is_final = false;
            routes.push(RouteDef {
                id,
                supplier: spec.supplier,
                receivers,
                batch_size: spec.batch_size,
                kind,
            });
        }

        let locations = self
            .locations
            .iter()
            .enumerate()
            .map(|(i, name)| LocationDef {
                name: name.clone(),
                capacity: capacities.get(&LocationId::new(i as u32)).copied(),
            })
            .collect();

        debug!(
            locations = self.locations.len(),
            components = self.components.len(),
            units = units.len(),
            routes = routes.len(),
            "model validated"
        );

        Ok(Model {
            locations,
            links: self.links.into_iter().collect(),
            components: self.components,
            units,
            routes,
        })
    }
}
