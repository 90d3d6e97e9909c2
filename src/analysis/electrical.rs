//! Per-record electrical quantities
//!
//! Three-phase apparent power, the guarded power factor ratio, reactive
//! power and nameplate loading. Every function is pure and total: no input
//! combination produces NaN or infinity from a finite reading.

use crate::constants::{MAX_POWER_FACTOR, MIN_POWER_FACTOR};
use crate::models::PowerFactorStatus;

/// Apparent power of a balanced three-phase load (kVA)
///
/// S = √3 · V_line · I_line / 1000, floored at zero.
pub fn apparent_power_kva(line_voltage_v: f64, current_a: f64) -> f64 {
    (3f64.sqrt() * line_voltage_v * current_a / 1000.0).max(0.0)
}

/// Power factor P/S with the degenerate and clipping policies applied
///
/// At or below `epsilon_kva` of apparent power there is no meaningful
/// current flow and the power factor is defined as exactly 0. Ratios outside
/// [0, 1] are capped to the nearest bound.
pub fn power_factor(
    active_power_kw: f64,
    apparent_power_kva: f64,
    epsilon_kva: f64,
) -> (f64, PowerFactorStatus) {
    if apparent_power_kva <= epsilon_kva {
        return (0.0, PowerFactorStatus::DegenerateApparentPower);
    }

    let ratio = active_power_kw / apparent_power_kva;
    if ratio > MAX_POWER_FACTOR {
        (MAX_POWER_FACTOR, PowerFactorStatus::Clipped)
    } else if ratio < MIN_POWER_FACTOR {
        (MIN_POWER_FACTOR, PowerFactorStatus::Clipped)
    } else {
        (ratio, PowerFactorStatus::Measured)
    }
}

/// Reactive power from the power triangle (kVAr)
///
/// A negative radicand means P exceeded S through sensor noise; it is
/// floored to zero before the square root.
pub fn reactive_power_kvar(apparent_power_kva: f64, active_power_kw: f64) -> f64 {
    let radicand = apparent_power_kva * apparent_power_kva - active_power_kw * active_power_kw;
    radicand.max(0.0).sqrt()
}

/// Active power as a percentage of the rated electrical input
pub fn load_percent(active_power_kw: f64, rated_input_power_kw: f64) -> f64 {
    100.0 * active_power_kw / rated_input_power_kw
}
