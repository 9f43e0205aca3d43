// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pressure-loss model.
//!
//! Straight duct segments use the Darcy-Weisbach equation with a laminar
//! (`64 / Re`) or Blasius (`0.3164 * Re^-0.25`) friction factor. Fittings and
//! terminals use constant placeholder losses; ζ-based fitting losses are not
//! modelled.

use ifc_lite_hvac_model::ElementKind;

use crate::geometry::DuctGeometry;

/// Density of air at 20 °C (kg/m³)
pub const AIR_DENSITY: f64 = 1.2041;
/// Dynamic viscosity of air at 20 °C (Pa·s)
pub const AIR_DYNAMIC_VISCOSITY: f64 = 1.81e-5;
/// Reynolds numbers below this are laminar
pub const LAMINAR_REYNOLDS_LIMIT: f64 = 2000.0;
/// Placeholder loss of any duct fitting (Pa)
pub const FITTING_PRESSURE_LOSS: f64 = 10.0;
/// Placeholder loss of an air terminal (Pa)
pub const TERMINAL_PRESSURE_LOSS: f64 = 0.2;

/// Mean velocity (m/s) of `flow` l/s through `area` m²
#[inline]
pub fn velocity(flow: f64, area: f64) -> f64 {
    (flow / 1000.0) / area
}

/// Reynolds number of air at velocity `v` in a duct of hydraulic diameter `d_h`
#[inline]
pub fn reynolds_number(v: f64, d_h: f64) -> f64 {
    AIR_DENSITY * v * d_h / AIR_DYNAMIC_VISCOSITY
}

/// Darcy friction factor
#[inline]
pub fn friction_factor(re: f64) -> f64 {
    if re < LAMINAR_REYNOLDS_LIMIT {
        64.0 / re
    } else {
        0.3164 * re.powf(-0.25)
    }
}

/// Dynamic pressure (Pa) at velocity `v`
#[inline]
pub fn dynamic_pressure(v: f64) -> f64 {
    0.5 * AIR_DENSITY * v * v
}

/// Friction loss (Pa) of `flow` l/s through a straight duct.
///
/// Zero flow loses nothing. Negative or non-finite flow has no result.
pub fn straight_duct_pressure_loss(flow: f64, duct: &DuctGeometry) -> Option<f64> {
    if !flow.is_finite() || flow < 0.0 {
        return None;
    }
    if flow == 0.0 {
        return Some(0.0);
    }
    let v = velocity(flow, duct.area);
    let re = reynolds_number(v, duct.hydraulic_diameter);
    let f = friction_factor(re);
    let loss = f * (dynamic_pressure(v) / duct.hydraulic_diameter) * duct.length;
    loss.is_finite().then_some(loss)
}

/// Pressure loss (Pa) of one element carrying `flow` l/s.
///
/// `None` means the element contributes nothing: duct segments without
/// dimensional data and element kinds with no loss model.
pub fn element_pressure_loss(
    kind: &ElementKind,
    duct: Option<&DuctGeometry>,
    flow: f64,
) -> Option<f64> {
    match kind {
        ElementKind::DuctSegment => straight_duct_pressure_loss(flow, duct?),
        ElementKind::DuctFitting => Some(FITTING_PRESSURE_LOSS),
        ElementKind::AirTerminal => Some(TERMINAL_PRESSURE_LOSS),
        _ => None,
    }
}
