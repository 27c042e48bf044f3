//! # fabrik-types: Core types for the fabrik simulation engine
//!
//! This crate contains shared types used across the fabrik workspace:
//! - Entity IDs ([`LocationId`], [`KindId`], [`UnitId`], [`RouteId`],
//!   [`ProcId`], [`ResourceId`], [`ClaimId`], [`EventId`])
//! - Virtual-time types ([`SimTime`], [`SimDuration`])
//! - Duration helpers ([`seconds`], [`hours`], [`days`])
//!
//! All IDs are cheap `Copy` newtypes over integers. Entities live in flat
//! arrays inside the kernel and are referenced exclusively through these
//! handles, which keeps the model graph free of ownership cycles.

use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

// ============================================================================
// Entity IDs - All Copy (cheap integer values)
// ============================================================================

macro_rules! index_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Position of the entity in its backing array.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! sequence_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

index_id! {
    /// Unique identifier for a location (a named bag of resources).
    LocationId
}

index_id! {
    /// Unique identifier for an interned component kind.
    KindId
}

index_id! {
    /// Unique identifier for a manufacturing unit.
    UnitId
}

index_id! {
    /// Unique identifier for a shipping route.
    RouteId
}

index_id! {
    /// Unique identifier for a registered process.
    ProcId
}

sequence_id! {
    /// Unique identifier for a resource instance. Identity is by instance,
    /// never by value.
    ResourceId
}

sequence_id! {
    /// Unique identifier for a claim submitted to the claim engine.
    ClaimId
}

sequence_id! {
    /// Identifier of a scheduled event. Assigned in insertion order, so it
    /// doubles as the deterministic tie-breaker within a virtual instant.
    EventId
}

// ============================================================================
// Virtual time
// ============================================================================

/// A point on the virtual-time axis, in base units since simulation start.
///
/// The base unit is one simulated second; see [`seconds`], [`hours`] and
/// [`days`]. Virtual time is unrelated to wall-clock time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn as_units(self) -> u64 {
        self.0
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<SimDuration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign<SimDuration> for SimTime {
    fn add_assign(&mut self, rhs: SimDuration) {
        self.0 += rhs.0;
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimDuration;

    fn sub(self, rhs: SimTime) -> SimDuration {
        SimDuration(self.0.saturating_sub(rhs.0))
    }
}

/// A span of virtual time, in base units.
///
/// Durations handed to `hold` must be non-negative integers in the base
/// unit, which this type guarantees by construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimDuration(u64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);

    /// The smallest representable span: one base unit.
    pub const TICK: SimDuration = SimDuration(1);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn as_units(self) -> u64 {
        self.0
    }
}

impl Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for SimDuration {
    type Output = SimDuration;

    fn add(self, rhs: SimDuration) -> SimDuration {
        SimDuration(self.0 + rhs.0)
    }
}

/// `n` simulated seconds (the base unit).
pub const fn seconds(n: u64) -> SimDuration {
    SimDuration::new(n)
}

/// `n` simulated hours.
pub const fn hours(n: u64) -> SimDuration {
    SimDuration::new(n * 3_600)
}

/// `n` simulated days.
pub const fn days(n: u64) -> SimDuration {
    SimDuration::new(n * 86_400)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_helpers_use_seconds_as_base_unit() {
        assert_eq!(seconds(1).as_units(), 1);
        assert_eq!(hours(2).as_units(), 7_200);
        assert_eq!(days(1).as_units(), 86_400);
        assert_eq!(SimDuration::TICK.as_units(), 1);
    }

    #[test]
    fn time_arithmetic() {
        let t = SimTime::ZERO + hours(1);
        assert_eq!(t.as_units(), 3_600);

        let later = t + seconds(30);
        assert_eq!(later - t, seconds(30));

        let mut cursor = SimTime::ZERO;
        cursor += hours(2);
        assert_eq!(cursor, SimTime::new(7_200));
    }

    #[test]
    fn ids_round_trip_through_raw_integers() {
        let loc = LocationId::new(7);
        assert_eq!(u32::from(loc), 7);
        assert_eq!(LocationId::from(7), loc);
        assert_eq!(loc.index(), 7);

        let res = ResourceId::new(9);
        assert_eq!(u64::from(res), 9);
        assert_eq!(res.to_string(), "9");
    }

    #[test]
    fn event_ids_order_by_insertion_sequence() {
        assert!(EventId::new(1) < EventId::new(2));
    }

    #[test]
    fn sim_time_serializes_as_plain_integer() {
        let t = SimTime::new(42);
        assert_eq!(serde_json::to_string(&t).expect("serialize"), "42");
    }
}
