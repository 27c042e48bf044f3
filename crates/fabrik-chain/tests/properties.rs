//! Property tests: deterministic replay and conservation over randomized
//! two-stage chains.

use std::collections::BTreeMap;

use fabrik_chain::{ModelBuilder, RouteSpec, SimConfig, Simulation, UnitSpec, simulate};
use fabrik_kernel::Holder;
use fabrik_types::{LocationId, ResourceId, SimTime, hours};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct ChainParams {
    seed: u64,
    seed_capacity: u32,
    production_size: u32,
    production_hours: u64,
    batch_size: u32,
    defect_rate: f64,
    delay_threshold: f64,
    run_hours: u64,
}

fn chain_params() -> impl Strategy<Value = ChainParams> {
    (
        any::<u64>(),
        5u32..=50,
        1u32..=10,
        1u64..=3,
        1u32..=8,
        prop_oneof![Just(0.0), Just(0.25), Just(0.5)],
        0.0..0.95f64,
        1u64..=20,
    )
        .prop_map(
            |(
                seed,
                seed_capacity,
                production_size,
                production_hours,
                batch_size,
                defect_rate,
                delay_threshold,
                run_hours,
            )| ChainParams {
                seed,
                seed_capacity,
                production_size,
                production_hours,
                batch_size,
                defect_rate,
                delay_threshold,
                run_hours,
            },
        )
}

fn build_and_run(params: &ChainParams) -> Simulation {
    let mut builder = ModelBuilder::new();
    let a_in = builder.location("assembly.input");
    let a_out = builder.location("assembly.output");
    let b_in = builder.location("fitting.input");
    let b_out = builder.location("fitting.output");
    builder.component("widget", a_in);
    builder.component("gadget", b_in);

    let a = builder.unit(UnitSpec {
        input: a_in,
        output: a_out,
        inputs_needed: BTreeMap::from([("widget".to_string(), 1)]),
        production_time: hours(params.production_hours),
        production_size: params.production_size,
        defect_rate: params.defect_rate,
        shipping_delay_threshold: params.delay_threshold,
        input_cap: 10_000,
        output_cap: 10_000,
        seed_unit: true,
    });
    let b = builder.unit(UnitSpec {
        input: b_in,
        output: b_out,
        inputs_needed: BTreeMap::from([("widget".to_string(), 2)]),
        production_time: hours(2),
        production_size: 3,
        defect_rate: 0.0,
        shipping_delay_threshold: 0.9,
        input_cap: 10_000,
        output_cap: 10_000,
        seed_unit: false,
    });
    builder.link(a_out, b_in);
    builder.route(RouteSpec {
        supplier: a,
        receivers: BTreeMap::from([(b, hours(1))]),
        batch_size: params.batch_size,
        component: "widget".to_string(),
    });
    let model = builder.build().expect("valid model");

    let config = SimConfig::default()
        .with_seed(params.seed)
        .with_seed_capacity(params.seed_capacity)
        .with_run_until(SimTime::ZERO + hours(params.run_hours));
    simulate(model, config).expect("run succeeds")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Identical seeds and inputs replay to identical metrics and
    /// identical per-location kind multisets.
    #[test]
    fn replay_is_bitwise_identical(params in chain_params()) {
        let first = build_and_run(&params);
        let second = build_and_run(&params);

        prop_assert_eq!(first.data(), second.data());
        prop_assert_eq!(first.location_multisets(), second.location_multisets());
        prop_assert_eq!(first.now(), second.now());
    }

    /// Every created resource ends in exactly one location, consumed, or
    /// discarded; indices agree with a recount; caps hold at quiescence.
    #[test]
    fn conservation_and_caps_hold(params in chain_params()) {
        let sim = build_and_run(&params);

        sim.store().audit().expect("store audit");

        let located: usize = (0..sim.store().locations_len())
            .map(|i| sim.occupancy(LocationId::new(i as u32)))
            .sum();
        let retired = (0..sim.store().created())
            .filter(|&i| {
                matches!(
                    sim.store().resource(ResourceId::new(i as u64)).holder,
                    Holder::Consumed | Holder::Discarded
                )
            })
            .count();
        prop_assert_eq!(located + retired, sim.store().created());

        for i in 0..sim.store().locations_len() {
            let loc = sim.store().location(LocationId::new(i as u32));
            if let Some(cap) = loc.capacity() {
                // Seeding may legitimately overfill a root; runtime deposits
                // never do. The generator keeps caps above the seed volume,
                // so the bound is strict here.
                prop_assert!(loc.occupancy() <= cap as usize);
            }
        }
    }

    /// Defective discards scale with completed shipments at the configured
    /// ratio.
    #[test]
    fn defect_accounting_matches_ratio(params in chain_params()) {
        let sim = build_and_run(&params);

        let done = sim.data().get(fabrik_chain::metrics::NUMBER_OF_SHIPPINGS_DONE);
        let exact = f64::from(params.batch_size) * (1.0 - params.defect_rate);
        let actual = (exact - 1e-9).ceil() as u64;
        let defective = u64::from(params.batch_size) - actual;

        prop_assert_eq!(
            sim.data().get(fabrik_chain::metrics::NUMBER_OF_DEFECTIVE_COMPONENTS),
            defective * done
        );
        prop_assert_eq!(
            sim.data().get(fabrik_chain::metrics::NUMBER_OF_COMPONENTS_SHIPPED),
            actual * done
        );
    }
}
