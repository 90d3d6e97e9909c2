//! Operating-state classification and aggregation scope

use crate::config::{AggregationScope, OperatingThresholds};
use crate::error::{PumpError, Result};
use crate::models::DerivedReading;
use tracing::info;

/// True when the reading meets every configured threshold (inclusive)
///
/// The power threshold applies to the derived active power, which in
/// mean-ratio mode is the corrected value.
pub fn is_operating(reading: &DerivedReading, thresholds: &OperatingThresholds) -> bool {
    let power_ok = thresholds
        .min_active_power_kw
        .is_none_or(|min| reading.active_power_kw >= min);
    let voltage_ok = thresholds
        .min_voltage_v
        .is_none_or(|min| reading.voltage_v >= min);
    power_ok && voltage_ok
}

/// Number of readings classified as operating
pub fn operating_count(readings: &[DerivedReading], thresholds: &OperatingThresholds) -> usize {
    readings
        .iter()
        .filter(|r| is_operating(r, thresholds))
        .count()
}

/// Rows the statistics should be computed over, in source order
pub fn select_scope(
    readings: &[DerivedReading],
    scope: AggregationScope,
    thresholds: &OperatingThresholds,
) -> Result<Vec<DerivedReading>> {
    match scope {
        AggregationScope::All => Ok(readings.to_vec()),
        AggregationScope::OperatingOnly => {
            if !thresholds.is_configured() {
                return Err(PumpError::configuration(
                    "operating-only scope requires a minimum active power or minimum voltage threshold",
                ));
            }
            let selected: Vec<DerivedReading> = readings
                .iter()
                .filter(|r| is_operating(r, thresholds))
                .copied()
                .collect();
            info!(
                "Operating-only scope kept {} of {} records",
                selected.len(),
                readings.len()
            );
            Ok(selected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::derive::{DerivationOptions, derive};
    use crate::models::Reading;
    use chrono::{Duration, NaiveDate};

    fn derived(rows: &[(f64, f64, f64)]) -> Vec<DerivedReading> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let readings: Vec<Reading> = rows
            .iter()
            .enumerate()
            .map(|(i, &(v, c, p))| Reading::new(start + Duration::minutes(i as i64), v, c, p))
            .collect();
        derive(&readings, &DerivationOptions::default())
            .unwrap()
            .readings
    }

    fn power_threshold(min: f64) -> OperatingThresholds {
        OperatingThresholds {
            min_active_power_kw: Some(min),
            min_voltage_v: None,
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let rows = derived(&[(440.0, 20.0, 1.0), (440.0, 20.0, 0.99)]);
        let thresholds = power_threshold(1.0);

        assert!(is_operating(&rows[0], &thresholds));
        assert!(!is_operating(&rows[1], &thresholds));
    }

    #[test]
    fn test_both_thresholds_must_hold() {
        let rows = derived(&[(440.0, 20.0, 5.0), (200.0, 20.0, 5.0), (440.0, 0.0, 0.0)]);
        let thresholds = OperatingThresholds {
            min_active_power_kw: Some(1.0),
            min_voltage_v: Some(400.0),
        };

        assert_eq!(operating_count(&rows, &thresholds), 1);
    }

    #[test]
    fn test_no_thresholds_means_everything_operates() {
        let rows = derived(&[(0.0, 0.0, 0.0)]);
        assert!(is_operating(&rows[0], &OperatingThresholds::default()));
    }

    #[test]
    fn test_scope_all_keeps_every_row() {
        let rows = derived(&[(440.0, 20.0, 5.0), (440.0, 0.0, 0.0)]);
        let selected =
            select_scope(&rows, AggregationScope::All, &OperatingThresholds::default()).unwrap();
        assert_eq!(selected, rows);
    }

    #[test]
    fn test_scope_operating_only_filters_in_order() {
        let rows = derived(&[
            (440.0, 20.0, 5.0),
            (440.0, 0.0, 0.0),
            (441.0, 21.0, 6.0),
            (442.0, 0.1, 0.2),
        ]);
        let selected =
            select_scope(&rows, AggregationScope::OperatingOnly, &power_threshold(1.0)).unwrap();

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].voltage_v, 440.0);
        assert_eq!(selected[1].voltage_v, 441.0);
    }

    #[test]
    fn test_scope_operating_only_requires_thresholds() {
        let rows = derived(&[(440.0, 20.0, 5.0)]);
        let err = select_scope(
            &rows,
            AggregationScope::OperatingOnly,
            &OperatingThresholds::default(),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }
}
