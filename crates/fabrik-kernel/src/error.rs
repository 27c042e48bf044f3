//! Error taxonomy of the simulation kernel.
//!
//! Only unrecoverable conditions are errors. Recoverable conditions are
//! ordinary values: an unsatisfiable claim parks (`ClaimOutcome::Parked`),
//! an expired claim deadline wakes the process with
//! `Wake::DeadlineExpired`, and a short `find` reports `Insufficient` to
//! the claim engine.

use fabrik_types::SimTime;
use thiserror::Error;

/// A fatal simulation failure.
///
/// Any of these aborts the run at the current virtual time; the `DataBag`
/// and store remain available for inspection.
#[derive(Debug, Error)]
pub enum SimError {
    /// A `move` was attempted across an absent edge.
    #[error("locations are not linked: {from} -> {to}")]
    NotLinked { from: String, to: String },

    /// A deposit would have pushed a location past its storage cap.
    #[error(
        "capacity exceeded at {location}: holding {holding} of {capacity}, \
         deposit of {attempted} refused"
    )]
    CapacityExceeded {
        location: String,
        holding: usize,
        capacity: u32,
        attempted: usize,
    },

    /// The virtual clock was asked to move backwards.
    #[error("virtual clock may not move backwards: now {now}, requested {requested}")]
    TimeRegression { now: SimTime, requested: SimTime },

    /// A kernel invariant was violated. Always a bug, never a model issue.
    #[error("internal invariant violated: {message}")]
    Invariant { message: String },
}

impl SimError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
