//! Structural validation errors surfaced during model assembly.

use fabrik_types::{RouteId, UnitId};
use thiserror::Error;

/// A structural invariant violated at setup. Fatal; surfaced from
/// [`crate::ModelBuilder::build`] before any simulation starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("duplicate location name '{0}'")]
    DuplicateLocation(String),

    #[error("duplicate component name '{0}'")]
    DuplicateComponent(String),

    #[error("unit {unit}: unknown component '{name}' in inputs")]
    UnknownComponent { unit: UnitId, name: String },

    #[error("unit {unit} declares no inputs")]
    EmptyInputs { unit: UnitId },

    #[error("unit {unit}: input count for '{name}' must be positive")]
    ZeroInputCount { unit: UnitId, name: String },

    #[error("unit {unit}: production size must be positive")]
    ZeroProductionSize { unit: UnitId },

    #[error("unit {unit}: {what} must lie in [0, 1), got {value}")]
    RateOutOfRange {
        unit: UnitId,
        what: &'static str,
        value: f64,
    },

    #[error("unit {unit}: {what} storage capacity must be positive")]
    ZeroCapacity { unit: UnitId, what: &'static str },

    #[error("location '{location}' cannot carry storage caps for two units")]
    CapacityConflict { location: String },

    #[error("unit {unit}: no component kind originates at its input location")]
    NoProducibleComponent { unit: UnitId },

    #[error("unit {unit}: several component kinds originate at its input location")]
    AmbiguousProduct { unit: UnitId },

    #[error("route {route}: batch size must be positive")]
    ZeroBatchSize { route: RouteId },

    #[error("route {route} has no receivers")]
    NoReceivers { route: RouteId },

    #[error("route {route}: unknown component kind '{name}'")]
    UnknownRouteKind { route: RouteId, name: String },

    #[error("route {route}: unknown unit {unit}")]
    UnknownUnit { route: RouteId, unit: UnitId },

    #[error("route {route}: missing link '{from}' -> '{to}'")]
    MissingLink {
        route: RouteId,
        from: String,
        to: String,
    },
}
