//! Metric keys written to the `DataBag` during a run.
//!
//! Every key is declared (at zero) when the simulation is constructed, so
//! reports from different runs always carry the same key set.

/// Shipping legs that drew an extra stochastic delay.
pub const NUMBER_OF_SHIPPING_DELAYS: &str = "number_of_shipping_delays";

/// Units discarded at the source by the defect policy.
pub const NUMBER_OF_DEFECTIVE_COMPONENTS: &str = "number_of_defective_components";

/// Sum of extra stochastic delays, in virtual-time units.
pub const LENGTH_OF_DELAYS: &str = "length_of_delays";

/// Sum of transport times including extra delays, in virtual-time units.
pub const TOTAL_SHIPPING_TIME_WITH_DELAYS: &str = "total_shipping_time_with_delays";

/// Completed shipping legs.
pub const NUMBER_OF_SHIPPINGS_DONE: &str = "number_of_shippings_done";

/// Components produced by final-stage units.
pub const TOTAL_FINAL_OUTPUT: &str = "total_final_output";

/// Components delivered to receivers.
pub const NUMBER_OF_COMPONENTS_SHIPPED: &str = "number_of_components_shipped";

/// Every key written during a run.
pub const ALL_KEYS: [&str; 7] = [
    NUMBER_OF_SHIPPING_DELAYS,
    NUMBER_OF_DEFECTIVE_COMPONENTS,
    LENGTH_OF_DELAYS,
    TOTAL_SHIPPING_TIME_WITH_DELAYS,
    NUMBER_OF_SHIPPINGS_DONE,
    TOTAL_FINAL_OUTPUT,
    NUMBER_OF_COMPONENTS_SHIPPED,
];
