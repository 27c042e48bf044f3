//! Per-unit manufacturing loop.

use fabrik_kernel::{Predicate, Process, Requirement, SimContext, SimError, Step, Wake};
use fabrik_types::{KindId, LocationId, SimDuration};
use tracing::trace;

use crate::metrics::TOTAL_FINAL_OUTPUT;
use crate::model::UnitDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for output headroom and input resources.
    Gathering,
    /// Inputs consumed; the production hold is running.
    Producing,
}

/// The manufacturing cycle of one unit: claim the needed inputs, consume
/// them, hold for the production time, deposit fresh product.
///
/// When the output location lacks headroom for a full batch the process
/// backs off one tick and retries, which is what keeps the output cap from
/// ever being exceeded. An unsatisfiable input claim simply parks; the
/// claim engine wakes the process when a deposit arrives.
#[derive(Debug)]
pub struct ProductionProcess {
    output: LocationId,
    requirement: Requirement,
    production_time: SimDuration,
    production_size: u32,
    product: KindId,
    output_cap: u32,
    is_final: bool,
    phase: Phase,
}

impl ProductionProcess {
    pub fn new(unit: &UnitDef) -> Self {
        let requirement = unit
            .inputs_needed
            .iter()
            .fold(Requirement::new(), |req, &(kind, count)| {
                req.and(unit.input, Predicate::Kind(kind), count)
            });
        Self {
            output: unit.output,
            requirement,
            production_time: unit.production_time,
            production_size: unit.production_size,
            product: unit.product,
            output_cap: unit.output_cap,
            is_final: unit.is_final,
            phase: Phase::Gathering,
        }
    }

    fn begin_cycle(&self, ctx: &SimContext<'_>) -> Step {
        if ctx.occupancy(self.output) + self.production_size as usize > self.output_cap as usize {
            Step::Hold(SimDuration::TICK)
        } else {
            Step::claim(self.requirement.clone())
        }
    }
}

impl Process for ProductionProcess {
    fn resume(&mut self, ctx: &mut SimContext<'_>, wake: Wake) -> Result<Step, SimError> {
        match (self.phase, wake) {
            (Phase::Gathering, Wake::Started | Wake::TimerElapsed) => Ok(self.begin_cycle(ctx)),
            (Phase::Gathering, Wake::Granted(handle)) => {
                let consumed = ctx.consume(handle)?;
                trace!(at = %ctx.now(), consumed, "production inputs consumed");
                self.phase = Phase::Producing;
                Ok(Step::Hold(self.production_time))
            }
            (Phase::Producing, Wake::TimerElapsed) => {
                for _ in 0..self.production_size {
                    ctx.create(self.output, self.product)?;
                }
                if self.is_final {
                    ctx.metric(TOTAL_FINAL_OUTPUT, u64::from(self.production_size));
                }
                trace!(at = %ctx.now(), produced = self.production_size, "production cycle done");
                self.phase = Phase::Gathering;
                Ok(self.begin_cycle(ctx))
            }
            (phase, wake) => Err(SimError::invariant(format!(
                "production process woke unexpectedly in {phase:?} with {wake:?}"
            ))),
        }
    }
}
