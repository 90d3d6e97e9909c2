//! Electrical derivation over a cleaned reading sequence
//!
//! Applies the configured voltage policy and processing mode:
//!
//! - **direct**: each record's power factor is its own P/S ratio and the
//!   measured power is used as active power.
//! - **mean-ratio**: the dataset mean of P/S is estimated first, then active
//!   power is recomputed as S times that mean for every record.

use super::electrical::{apparent_power_kva, load_percent, power_factor, reactive_power_kvar};
use super::summary::ordered_sum;
use crate::config::{PipelineConfig, ProcessingMode, VoltagePolicy};
use crate::constants::{MAX_POWER_FACTOR, MIN_POWER_FACTOR};
use crate::error::{PumpError, Result};
use crate::models::{DerivedReading, PowerFactorStatus, Reading};
use crate::nameplate::NameplateRating;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Inputs of the derivation that do not come from the data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivationOptions {
    pub voltage_policy: VoltagePolicy,
    pub mode: ProcessingMode,
    pub epsilon_kva: f64,
    pub nameplate: NameplateRating,
}

impl DerivationOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            voltage_policy: config.voltage_policy,
            mode: config.mode,
            epsilon_kva: config.apparent_power_epsilon_kva,
            nameplate: config.nameplate,
        }
    }
}

impl Default for DerivationOptions {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Dataset-wide power factor estimate used by the mean-ratio mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanPowerFactorEstimate {
    /// Mean of P/S over records with non-degenerate apparent power
    pub raw_mean: f64,
    /// `raw_mean` clamped into [0, 1]; the value actually applied
    pub applied: f64,
    /// Records that contributed to the mean
    pub samples: usize,
}

impl MeanPowerFactorEstimate {
    pub fn was_clamped(&self) -> bool {
        self.raw_mean != self.applied
    }
}

/// Counters of the derivation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivationStats {
    pub total: usize,
    /// Records whose apparent power was at or below epsilon
    pub degenerate_apparent_power: usize,
    /// Records whose power factor ratio was capped into [0, 1]
    pub clipped_power_factor: usize,
}

/// Derived records with the statistics of the pass
#[derive(Debug, Clone)]
pub struct DerivationOutput {
    pub readings: Vec<DerivedReading>,
    pub stats: DerivationStats,
    /// Present only in mean-ratio mode
    pub mean_power_factor: Option<MeanPowerFactorEstimate>,
}

/// Derive electrical quantities for every reading, preserving order
pub fn derive(readings: &[Reading], options: &DerivationOptions) -> Result<DerivationOutput> {
    options.nameplate.validate()?;

    let mean_power_factor = match options.mode {
        ProcessingMode::Direct => None,
        ProcessingMode::MeanRatio => Some(estimate_mean_power_factor(readings, options)?),
    };
    let active_override = mean_power_factor.map(|estimate| estimate.applied);

    let derived: Vec<DerivedReading> = readings
        .iter()
        .map(|reading| derive_reading(reading, options, active_override))
        .collect();

    let stats = DerivationStats {
        total: derived.len(),
        degenerate_apparent_power: derived
            .iter()
            .filter(|r| r.power_factor_status == PowerFactorStatus::DegenerateApparentPower)
            .count(),
        clipped_power_factor: derived
            .iter()
            .filter(|r| r.power_factor_status == PowerFactorStatus::Clipped)
            .count(),
    };

    if stats.degenerate_apparent_power > 0 {
        warn!(
            "{} records with apparent power at or below {} kVA; power factor reported as 0",
            stats.degenerate_apparent_power, options.epsilon_kva
        );
    }
    if stats.clipped_power_factor > 0 {
        warn!(
            "{} records had a power factor ratio outside [0, 1] and were clipped",
            stats.clipped_power_factor
        );
    }

    info!(
        "Derived {} records (mode: {}, voltage policy: {})",
        stats.total, options.mode, options.voltage_policy
    );

    Ok(DerivationOutput {
        readings: derived,
        stats,
        mean_power_factor,
    })
}

/// Derive one record
///
/// With `mean_power_factor` set, active power is recomputed as S times that
/// value; otherwise the measured power is used as is.
pub fn derive_reading(
    reading: &Reading,
    options: &DerivationOptions,
    mean_power_factor: Option<f64>,
) -> DerivedReading {
    let line_voltage = options.voltage_policy.line_voltage(reading.voltage_v);
    let apparent = apparent_power_kva(line_voltage, reading.current_a);
    let (pf, status) = power_factor(reading.active_power_kw, apparent, options.epsilon_kva);

    let active = match mean_power_factor {
        Some(mean_pf) => apparent * mean_pf,
        None => reading.active_power_kw,
    };

    DerivedReading {
        timestamp: reading.timestamp,
        voltage_v: reading.voltage_v,
        current_a: reading.current_a,
        measured_active_power_kw: reading.active_power_kw,
        active_power_kw: active,
        apparent_power_kva: apparent,
        power_factor: pf,
        power_factor_status: status,
        reactive_power_kvar: reactive_power_kvar(apparent, active),
        load_percent: load_percent(active, options.nameplate.rated_input_power_kw()),
    }
}

/// First pass of the mean-ratio mode
///
/// Records with degenerate apparent power carry no ratio and are skipped.
/// Ratios are summed in sorted order so the estimate does not depend on row
/// order.
pub fn estimate_mean_power_factor(
    readings: &[Reading],
    options: &DerivationOptions,
) -> Result<MeanPowerFactorEstimate> {
    let mut ratios: Vec<f64> = readings
        .iter()
        .filter_map(|reading| {
            let line_voltage = options.voltage_policy.line_voltage(reading.voltage_v);
            let apparent = apparent_power_kva(line_voltage, reading.current_a);
            (apparent > options.epsilon_kva).then(|| reading.active_power_kw / apparent)
        })
        .collect();

    if ratios.is_empty() {
        return Err(PumpError::empty_dataset(
            "no record has non-degenerate apparent power; cannot estimate a mean power factor",
        ));
    }

    let samples = ratios.len();
    let raw_mean = ordered_sum(&mut ratios) / samples as f64;
    let applied = raw_mean.clamp(MIN_POWER_FACTOR, MAX_POWER_FACTOR);

    let estimate = MeanPowerFactorEstimate {
        raw_mean,
        applied,
        samples,
    };

    if estimate.was_clamped() {
        warn!(
            "Estimated mean power factor {:.4} lies outside [0, 1]; applying {:.4}",
            raw_mean, applied
        );
    } else {
        debug!(
            "Estimated mean power factor {:.4} from {} records",
            applied, samples
        );
    }

    Ok(estimate)
}
