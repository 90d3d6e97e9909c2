//! Time bucketing of derived readings
//!
//! Buckets are aligned to the Unix epoch: a reading belongs to the bucket
//! starting at `floor(t / width) * width`. Each populated bucket yields one
//! row holding the per-field mean of its readings. Buckets between the first
//! and last populated bucket that received nothing are skipped or filled
//! according to the [`FillPolicy`]. A value fill is bounded: a span that
//! would need more than [`MAX_FILLED_BUCKETS`] empty buckets is refused.

use super::summary::ordered_sum;
use crate::config::{FillPolicy, ResampleConfig, ResampleInterval};
use crate::constants::{FILL_WARN_RATIO, MAX_FILLED_BUCKETS};
use crate::error::{PumpError, Result};
use crate::models::{DerivedReading, Field, NumericRow};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// One time bucket of aggregated readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampledReading {
    pub bucket_start: NaiveDateTime,
    /// Readings that fell into the bucket; 0 for a filled gap
    pub sample_count: usize,
    pub voltage_v: f64,
    pub current_a: f64,
    pub measured_active_power_kw: f64,
    pub active_power_kw: f64,
    pub apparent_power_kva: f64,
    pub power_factor: f64,
    pub reactive_power_kvar: f64,
    pub load_percent: f64,
}

impl ResampledReading {
    fn from_bucket(bucket_start: NaiveDateTime, members: &[&DerivedReading]) -> Self {
        let mean = |field: Field| {
            let mut values: Vec<f64> = members.iter().map(|r| r.value(field)).collect();
            ordered_sum(&mut values) / values.len() as f64
        };

        Self {
            bucket_start,
            sample_count: members.len(),
            voltage_v: mean(Field::VoltageV),
            current_a: mean(Field::CurrentA),
            measured_active_power_kw: mean(Field::MeasuredActivePowerKw),
            active_power_kw: mean(Field::ActivePowerKw),
            apparent_power_kva: mean(Field::ApparentPowerKva),
            power_factor: mean(Field::PowerFactor),
            reactive_power_kvar: mean(Field::ReactivePowerKvar),
            load_percent: mean(Field::LoadPercent),
        }
    }

    fn filled(bucket_start: NaiveDateTime, value: f64) -> Self {
        Self {
            bucket_start,
            sample_count: 0,
            voltage_v: value,
            current_a: value,
            measured_active_power_kw: value,
            active_power_kw: value,
            apparent_power_kva: value,
            power_factor: value,
            reactive_power_kvar: value,
            load_percent: value,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.sample_count == 0
    }
}

impl NumericRow for ResampledReading {
    fn timestamp(&self) -> NaiveDateTime {
        self.bucket_start
    }

    fn value(&self, field: Field) -> f64 {
        match field {
            Field::VoltageV => self.voltage_v,
            Field::CurrentA => self.current_a,
            Field::MeasuredActivePowerKw => self.measured_active_power_kw,
            Field::ActivePowerKw => self.active_power_kw,
            Field::ApparentPowerKva => self.apparent_power_kva,
            Field::PowerFactor => self.power_factor,
            Field::ReactivePowerKvar => self.reactive_power_kvar,
            Field::LoadPercent => self.load_percent,
        }
    }
}

/// Bucket width in seconds; at least one second
pub fn interval_seconds(interval: ResampleInterval) -> i64 {
    match interval {
        ResampleInterval::Minutes(n) => (i64::from(n) * SECONDS_PER_MINUTE).max(1),
        ResampleInterval::Hourly => SECONDS_PER_HOUR,
        ResampleInterval::Daily => SECONDS_PER_DAY,
    }
}

fn bucket_key(timestamp: NaiveDateTime, width: i64) -> i64 {
    timestamp.and_utc().timestamp().div_euclid(width) * width
}

fn key_to_datetime(key: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(key, 0).map(|dt| dt.naive_utc())
}

/// Start of the bucket containing `timestamp`
pub fn bucket_start(timestamp: NaiveDateTime, interval: ResampleInterval) -> NaiveDateTime {
    key_to_datetime(bucket_key(timestamp, interval_seconds(interval))).unwrap_or(timestamp)
}

/// Empty buckets between the first and last populated bucket
pub fn gap_bucket_count(first_key: i64, last_key: i64, width: i64, populated: usize) -> i64 {
    let span = (last_key - first_key) / width + 1;
    span.saturating_sub(populated as i64).max(0)
}

/// Aggregate readings into time buckets, ordered by bucket start
///
/// Fails with a configuration error when a value fill would create more
/// than [`MAX_FILLED_BUCKETS`] empty buckets, which usually means an
/// outlier timestamp stretched the span.
pub fn resample(
    readings: &[DerivedReading],
    config: &ResampleConfig,
) -> Result<Vec<ResampledReading>> {
    let width = interval_seconds(config.interval);

    let mut buckets: BTreeMap<i64, Vec<&DerivedReading>> = BTreeMap::new();
    for reading in readings {
        buckets
            .entry(bucket_key(reading.timestamp, width))
            .or_default()
            .push(reading);
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        debug!("No readings to resample");
        return Ok(Vec::new());
    };

    let mut rows = Vec::with_capacity(buckets.len());
    match config.fill {
        FillPolicy::Skip => {
            for (key, members) in &buckets {
                if let Some(start) = key_to_datetime(*key) {
                    rows.push(ResampledReading::from_bucket(start, members));
                }
            }
        }
        FillPolicy::Value(value) => {
            let gaps = gap_bucket_count(first, last, width, buckets.len());
            if gaps > MAX_FILLED_BUCKETS {
                return Err(PumpError::configuration(format!(
                    "filling gaps would create {} empty {} buckets between {} and {} \
                     (limit {}); check for outlier timestamps or skip empty buckets",
                    gaps,
                    config.interval,
                    bucket_start_label(first),
                    bucket_start_label(last),
                    MAX_FILLED_BUCKETS
                )));
            }
            if gaps > FILL_WARN_RATIO * buckets.len() as i64 {
                warn!(
                    "Filling {} empty {} buckets for {} populated ones; the time span may include outlier timestamps",
                    gaps,
                    config.interval,
                    buckets.len()
                );
            }

            let mut key = first;
            while key <= last {
                if let Some(start) = key_to_datetime(key) {
                    rows.push(match buckets.get(&key) {
                        Some(members) => ResampledReading::from_bucket(start, members),
                        None => ResampledReading::filled(start, value),
                    });
                }
                key += width;
            }
        }
    }

    let filled = rows.iter().filter(|r| r.is_filled()).count();
    info!(
        "Resampled {} records into {} {} buckets ({} filled)",
        readings.len(),
        rows.len(),
        config.interval,
        filled
    );

    Ok(rows)
}

fn bucket_start_label(key: i64) -> String {
    key_to_datetime(key)
        .map(|start| start.to_string())
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::derive::{DerivationOptions, derive};
    use crate::models::Reading;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn derived(rows: &[(NaiveDateTime, f64)]) -> Vec<DerivedReading> {
        let readings: Vec<Reading> = rows
            .iter()
            .map(|&(ts, power)| Reading::new(ts, 440.0, 20.0, power))
            .collect();
        derive(&readings, &DerivationOptions::default())
            .unwrap()
            .readings
    }

    fn config(interval: ResampleInterval, fill: FillPolicy) -> ResampleConfig {
        ResampleConfig { interval, fill }
    }

    #[test]
    fn test_bucket_start_alignment() {
        assert_eq!(
            bucket_start(at(1, 10, 37), ResampleInterval::Hourly),
            at(1, 10, 0)
        );
        assert_eq!(
            bucket_start(at(1, 10, 37), ResampleInterval::Minutes(15)),
            at(1, 10, 30)
        );
        assert_eq!(
            bucket_start(at(1, 23, 59), ResampleInterval::Daily),
            at(1, 0, 0)
        );
    }

    #[test]
    fn test_bucket_start_before_epoch() {
        let ts = NaiveDate::from_ymd_opt(1969, 12, 31)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(1969, 12, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        assert_eq!(bucket_start(ts, ResampleInterval::Hourly), expected);
    }

    #[test]
    fn test_hourly_means() {
        let rows = derived(&[
            (at(1, 10, 0), 10.0),
            (at(1, 10, 30), 12.0),
            (at(1, 11, 15), 14.0),
        ]);
        let out = resample(&rows, &config(ResampleInterval::Hourly, FillPolicy::Skip)).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bucket_start, at(1, 10, 0));
        assert_eq!(out[0].sample_count, 2);
        assert_eq!(out[0].active_power_kw, 11.0);
        assert_eq!(out[1].sample_count, 1);
        assert_eq!(out[1].active_power_kw, 14.0);
    }

    #[test]
    fn test_unordered_input_yields_ordered_buckets() {
        let rows = derived(&[
            (at(2, 9, 0), 3.0),
            (at(1, 9, 0), 1.0),
            (at(1, 18, 0), 2.0),
        ]);
        let out = resample(&rows, &config(ResampleInterval::Daily, FillPolicy::Skip)).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bucket_start, at(1, 0, 0));
        assert_eq!(out[0].active_power_kw, 1.5);
        assert_eq!(out[1].bucket_start, at(2, 0, 0));
    }

    #[test]
    fn test_skip_policy_leaves_gaps() {
        let rows = derived(&[(at(1, 10, 0), 10.0), (at(1, 13, 0), 12.0)]);
        let out = resample(&rows, &config(ResampleInterval::Hourly, FillPolicy::Skip)).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.is_filled()));
    }

    #[test]
    fn test_value_policy_fills_gaps() {
        let rows = derived(&[(at(1, 10, 0), 10.0), (at(1, 13, 0), 12.0)]);
        let out = resample(
            &rows,
            &config(ResampleInterval::Hourly, FillPolicy::Value(0.0)),
        )
        .unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[1].bucket_start, at(1, 11, 0));
        assert!(out[1].is_filled());
        assert_eq!(out[1].active_power_kw, 0.0);
        assert_eq!(out[2].power_factor, 0.0);
        assert_eq!(out[3].active_power_kw, 12.0);
    }

    #[test]
    fn test_gap_bucket_count() {
        assert_eq!(gap_bucket_count(0, 0, 60, 1), 0);
        assert_eq!(gap_bucket_count(0, 3 * 3_600, 3_600, 2), 2);
        assert_eq!(gap_bucket_count(0, 3 * 3_600, 3_600, 4), 0);
    }

    #[test]
    fn test_value_fill_over_outlier_span_is_refused() {
        let outlier = NaiveDate::from_ymd_opt(2019, 2, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let rows = derived(&[(outlier, 9.0), (at(1, 10, 0), 10.0), (at(1, 10, 1), 11.0)]);

        let err = resample(
            &rows,
            &config(ResampleInterval::Minutes(1), FillPolicy::Value(0.0)),
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("outlier"));

        let skipped = resample(&rows, &config(ResampleInterval::Minutes(1), FillPolicy::Skip))
            .unwrap();
        assert_eq!(skipped.len(), 3);
    }

    #[test]
    fn test_value_fill_within_limit_succeeds() {
        let rows = derived(&[(at(1, 0, 0), 10.0), (at(20, 0, 0), 12.0)]);
        let out = resample(
            &rows,
            &config(ResampleInterval::Minutes(1), FillPolicy::Value(0.0)),
        )
        .unwrap();

        assert_eq!(out.len(), 19 * 24 * 60 + 1);
        assert_eq!(out.iter().filter(|r| !r.is_filled()).count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let out = resample(&[], &config(ResampleInterval::Hourly, FillPolicy::Value(0.0))).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_bucket_means_independent_of_order() {
        let mut rows = derived(&[
            (at(1, 10, 1), 0.1),
            (at(1, 10, 2), 0.2),
            (at(1, 10, 3), 0.3),
            (at(1, 10, 4), 1e6),
        ]);
        let forward = resample(&rows, &config(ResampleInterval::Hourly, FillPolicy::Skip)).unwrap();
        rows.reverse();
        let backward = resample(&rows, &config(ResampleInterval::Hourly, FillPolicy::Skip)).unwrap();

        assert_eq!(forward, backward);
    }
}
