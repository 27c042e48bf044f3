//! Cooperative processes and their suspension protocol.
//!
//! A process is a resumable state machine. The scheduler calls `resume`
//! with the reason for the wake-up; the process runs without time passing,
//! mutates shared state through the [`SimContext`], and returns the `Step`
//! it suspends on. Those steps are the only points where control yields.

use fabrik_types::SimDuration;

use crate::claim::{ClaimHandle, Requirement};
use crate::error::SimError;
use crate::scheduler::SimContext;

/// What a process does next.
#[derive(Debug, Clone)]
pub enum Step {
    /// Sleep for the given duration.
    Hold(SimDuration),
    /// Acquire resources; parks until satisfiable. With a deadline, the
    /// process wakes with [`Wake::DeadlineExpired`] if the grant has not
    /// arrived by then.
    Claim {
        requirement: Requirement,
        deadline: Option<SimDuration>,
    },
    /// Terminate the process.
    Done,
}

impl Step {
    pub fn claim(requirement: Requirement) -> Self {
        Step::Claim {
            requirement,
            deadline: None,
        }
    }

    pub fn claim_with_deadline(requirement: Requirement, deadline: SimDuration) -> Self {
        Step::Claim {
            requirement,
            deadline: Some(deadline),
        }
    }
}

/// Why the scheduler is resuming a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// First activation after spawn.
    Started,
    /// A `hold` elapsed.
    TimerElapsed,
    /// A claim was granted; the handle owns the reserved resources.
    Granted(ClaimHandle),
    /// A claim deadline expired; the claim has been cancelled. Recoverable.
    DeadlineExpired,
}

/// Lifecycle state of a registered process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Ready,
    Running,
    Waiting(WaitKind),
    Done,
}

/// What a waiting process is suspended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Hold,
    Claim,
}

/// A resumable state machine driven by the scheduler.
pub trait Process {
    /// Run until the next suspension point. No virtual time passes inside a
    /// single call.
    fn resume(&mut self, ctx: &mut SimContext<'_>, wake: Wake) -> Result<Step, SimError>;
}
