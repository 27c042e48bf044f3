//! Monotonic virtual-time counter.

use fabrik_types::SimTime;

use crate::error::SimError;

/// The simulation clock. Strictly monotonic; only the scheduler advances it.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Advance the clock to `t`. Asking for a time in the past is a kernel
    /// bug and fails loudly.
    pub fn advance_to(&mut self, t: SimTime) -> Result<(), SimError> {
        if t < self.now {
            return Err(SimError::TimeRegression {
                now: self.now,
                requested: t,
            });
        }
        self.now = t;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabrik_types::hours;

    #[test]
    fn clock_starts_at_zero_and_advances() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now(), SimTime::ZERO);

        clock.advance_to(SimTime::ZERO + hours(1)).expect("forward");
        assert_eq!(clock.now().as_units(), 3_600);

        // Advancing to the current instant is a no-op, not a regression.
        clock.advance_to(clock.now()).expect("same instant");
    }

    #[test]
    fn clock_refuses_to_move_backwards() {
        let mut clock = SimClock::new();
        clock.advance_to(SimTime::new(10)).expect("forward");

        let err = clock.advance_to(SimTime::new(9)).unwrap_err();
        assert!(matches!(
            err,
            SimError::TimeRegression { now, requested }
                if now == SimTime::new(10) && requested == SimTime::new(9)
        ));
    }
}
