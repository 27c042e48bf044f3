//! Per-route shipping loop.

use fabrik_kernel::{ClaimHandle, Predicate, Process, Requirement, SimContext, SimError, Step, Wake};
use fabrik_types::{KindId, LocationId, SimDuration};
use tracing::trace;

use crate::metrics::{
    LENGTH_OF_DELAYS, NUMBER_OF_COMPONENTS_SHIPPED, NUMBER_OF_DEFECTIVE_COMPONENTS,
    NUMBER_OF_SHIPPINGS_DONE, NUMBER_OF_SHIPPING_DELAYS, TOTAL_SHIPPING_TIME_WITH_DELAYS,
};
use crate::model::{Model, RouteDef};

/// One receiver of the route.
#[derive(Debug, Clone, Copy)]
struct Leg {
    receiver_input: LocationId,
    input_cap: u32,
    transport: SimDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for receiver headroom and supplier stock.
    AwaitingStock,
    /// A batch is reserved at the source and the transport hold runs.
    InTransit,
}

/// The shipping cycle of one route, serving its receivers round-robin in
/// ascending unit-id order.
///
/// Per leg: back off while the receiver lacks headroom for a full batch,
/// claim the defect-adjusted batch at the supplier output, discard the
/// defective difference at the source, hold for the transport time (plus a
/// stochastic delay when the draw exceeds the supplier's threshold), then
/// move the batch into the receiver input.
#[derive(Debug)]
pub struct ShippingProcess {
    source: LocationId,
    kind: KindId,
    batch_size: u32,
    defect_rate: f64,
    delay_threshold: f64,
    legs: Vec<Leg>,
    current: usize,
    pending_actual: u32,
    in_transit: Option<ClaimHandle>,
    phase: Phase,
}

impl ShippingProcess {
    pub fn new(route: &RouteDef, model: &Model) -> Self {
        let supplier = model.unit(route.supplier);
        let legs = route
            .receivers
            .iter()
            .map(|&(receiver, transport)| {
                let receiver = model.unit(receiver);
                Leg {
                    receiver_input: receiver.input,
                    input_cap: receiver.input_cap,
                    transport,
                }
            })
            .collect();
        Self {
            source: supplier.output,
            kind: route.kind,
            batch_size: route.batch_size,
            defect_rate: supplier.defect_rate,
            delay_threshold: supplier.shipping_delay_threshold,
            legs,
            current: 0,
            pending_actual: 0,
            in_transit: None,
            phase: Phase::AwaitingStock,
        }
    }

    /// Pick the next serviceable leg and claim for it, or back off a tick.
    fn dispatch_leg(&mut self, ctx: &SimContext<'_>) -> Step {
        for _ in 0..self.legs.len() {
            let leg = self.legs[self.current];
            if ctx.occupancy(leg.receiver_input) + self.batch_size as usize
                > leg.input_cap as usize
            {
                return Step::Hold(SimDuration::TICK);
            }
            let actual = actual_batch(self.batch_size, self.defect_rate);
            if actual == 0 {
                self.current = (self.current + 1) % self.legs.len();
                continue;
            }
            self.pending_actual = actual;
            return Step::claim(Requirement::atom(
                self.source,
                Predicate::Kind(self.kind),
                actual,
            ));
        }
        Step::Hold(SimDuration::TICK)
    }
}

impl Process for ShippingProcess {
    fn resume(&mut self, ctx: &mut SimContext<'_>, wake: Wake) -> Result<Step, SimError> {
        match (self.phase, wake) {
            (Phase::AwaitingStock, Wake::Started | Wake::TimerElapsed) => Ok(self.dispatch_leg(ctx)),
            (Phase::AwaitingStock, Wake::Granted(handle)) => {
                let leg = self.legs[self.current];
                let defective = self.batch_size - self.pending_actual;
                if defective > 0 {
                    let taken = ctx.discard(self.source, &Predicate::Kind(self.kind), defective)?;
                    trace!(at = %ctx.now(), defective, taken, "defective units discarded at source");
                }

                let draw = ctx.draw_factor();
                let delay = if draw > self.delay_threshold {
                    SimDuration::new((leg.transport.as_units() as f64 * draw) as u64)
                } else {
                    SimDuration::ZERO
                };
                if delay > SimDuration::ZERO {
                    ctx.metric(NUMBER_OF_SHIPPING_DELAYS, 1);
                    ctx.metric(LENGTH_OF_DELAYS, delay.as_units());
                    trace!(at = %ctx.now(), delay = %delay, "shipping leg delayed");
                }
                ctx.metric(
                    TOTAL_SHIPPING_TIME_WITH_DELAYS,
                    (leg.transport + delay).as_units(),
                );

                self.in_transit = Some(handle);
                self.phase = Phase::InTransit;
                Ok(Step::Hold(leg.transport + delay))
            }
            (Phase::InTransit, Wake::TimerElapsed) => {
                let leg = self.legs[self.current];
                let Some(handle) = self.in_transit.take() else {
                    return Err(SimError::invariant("shipment in transit without a claim"));
                };
                let moved = ctx.move_claim(handle, leg.receiver_input)?;
                ctx.metric(NUMBER_OF_COMPONENTS_SHIPPED, moved as u64);
                ctx.metric(NUMBER_OF_SHIPPINGS_DONE, 1);
                ctx.metric(
                    NUMBER_OF_DEFECTIVE_COMPONENTS,
                    u64::from(self.batch_size - self.pending_actual),
                );
                trace!(at = %ctx.now(), moved, "shipment delivered");

                self.current = (self.current + 1) % self.legs.len();
                self.phase = Phase::AwaitingStock;
                Ok(self.dispatch_leg(ctx))
            }
            (phase, wake) => Err(SimError::invariant(format!(
                "shipping process woke unexpectedly in {phase:?} with {wake:?}"
            ))),
        }
    }
}

/// Batch size surviving the defect policy: `ceil(batch * (1 - rate))`.
fn actual_batch(batch_size: u32, defect_rate: f64) -> u32 {
    let exact = f64::from(batch_size) * (1.0 - defect_rate);
    // f64 noise must not push an integral product up a whole unit.
    (exact - 1e-9).ceil().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::actual_batch;

    #[test_case(1, 0.0 => 1 ; "single unit, no defects")]
    #[test_case(1, 0.5 => 1 ; "single unit survives any rate below one")]
    #[test_case(1, 0.99 => 1 ; "single unit, extreme rate")]
    #[test_case(10, 0.0 => 10 ; "no defects passes the batch through")]
    #[test_case(10, 0.3 => 7 ; "three in ten discarded")]
    #[test_case(10, 0.25 => 8 ; "fractional survivors round up")]
    #[test_case(4, 0.5 => 2 ; "half discarded")]
    fn actual_batch_arithmetic(batch: u32, rate: f64) -> u32 {
        actual_batch(batch, rate)
    }
}
