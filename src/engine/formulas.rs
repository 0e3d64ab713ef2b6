//! Derived indicator formulas
//!
//! Efficiency and density are never authoritative state: they are
//! recomputed from units, manpower and front length every turn.

use crate::core::config::{DensityConstants, EfficiencyConstants};

/// Span-of-control efficiency
///
/// `1 / (1 + alpha · e^(beta · (units − optimal)))`. Peaks at `1/(1+alpha)`
/// when `units == optimal` and decays as units grow past the optimum.
pub fn efficiency(units: u32, constants: &EfficiencyConstants) -> f64 {
    let excess = f64::from(units) - f64::from(constants.optimal_units);
    1.0 / (1.0 + constants.alpha * (constants.beta * excess).exp())
}

/// Soldiers per km of front, normalized so 1.0 is an adequately held line
pub fn relative_density(manpower: u64, front_length: f64, constants: &DensityConstants) -> f64 {
    debug_assert!(front_length > 0.0, "front length must stay positive");
    (manpower as f64 / front_length) / constants.norm
}

/// Both derived indicators before any modifier is folded in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseMetrics {
    pub efficiency: f64,
    pub density: f64,
}

impl BaseMetrics {
    pub fn compute(
        units: u32,
        manpower: u64,
        front_length: f64,
        efficiency_constants: &EfficiencyConstants,
        density_constants: &DensityConstants,
    ) -> Self {
        Self {
            efficiency: efficiency(units, efficiency_constants),
            density: relative_density(manpower, front_length, density_constants),
        }
    }
}
