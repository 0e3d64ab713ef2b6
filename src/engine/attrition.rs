//! Territory and personnel attrition
//!
//! Territory creeps away every turn at a base rate. Once the line thins
//! below the critical density an exponential collapse term joins in, and
//! poor command efficiency amplifies the whole loss. Desertion is a flat
//! rate until morale drops below the threshold, then it grows quadratically.

use crate::core::config::AttritionConstants;

/// Whether the exponential collapse term applies at this density
pub fn is_collapsing(relative_density: f64, constants: &AttritionConstants) -> bool {
    relative_density < constants.critical_density
}

/// Territory lost this turn (km²)
pub fn territory_loss(relative_density: f64, efficiency: f64, constants: &AttritionConstants) -> f64 {
    let mut loss = constants.base_loss;

    if is_collapsing(relative_density, constants) {
        let shortfall = constants.critical_density - relative_density;
        loss += constants.collapse_scale * (constants.collapse_rate * shortfall).exp();
    }

    loss / efficiency
}

/// Weekly desertion rate for the given morale
pub fn awol_rate(morale: f64, constants: &AttritionConstants) -> f64 {
    let mut rate = constants.awol_base_rate;

    if morale < constants.morale_threshold {
        let deficit = (constants.morale_threshold - morale) / constants.morale_threshold;
        rate += constants.awol_quadratic_scale * deficit * deficit;
    }

    rate
}

/// Personnel lost to desertion this turn
pub fn awol_loss(manpower: u64, morale: f64, constants: &AttritionConstants) -> u64 {
    let lost = (manpower as f64 * awol_rate(morale, constants)).floor();
    // Rate never exceeds 1 for a validated config, so this never exceeds manpower
    (lost as u64).min(manpower)
}
