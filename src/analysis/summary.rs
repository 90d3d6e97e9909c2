//! Descriptive statistics over derived or resampled rows
//!
//! Each numeric field gets count, mean, sample standard deviation, min, max
//! and the three quartiles. Values are sorted before any reduction so the
//! result is bit-identical whatever the input row order.

use crate::config::{AggregationScope, ResampleInterval};
use crate::constants::round_to;
use crate::error::{PumpError, Result};
use crate::models::{Field, NumericRow};
use serde::{Deserialize, Serialize};

/// Statistics of one numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field: Field,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single value
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl FieldSummary {
    /// Summarize a non-empty set of values
    pub fn from_values(field: Field, values: &mut [f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(PumpError::empty_dataset(format!(
                "no values for {}",
                field.column_name()
            )));
        }

        let mean = ordered_sum(values) / values.len() as f64;
        let std_dev = sample_std_dev(values, mean);

        Ok(Self {
            field,
            count: values.len(),
            mean,
            std_dev,
            min: values[0],
            max: values[values.len() - 1],
            q1: quantile(values, 0.25),
            median: quantile(values, 0.5),
            q3: quantile(values, 0.75),
        })
    }

    fn rounded(&self, decimals: u32) -> Self {
        Self {
            mean: round_to(self.mean, decimals),
            std_dev: round_to(self.std_dev, decimals),
            min: round_to(self.min, decimals),
            max: round_to(self.max, decimals),
            q1: round_to(self.q1, decimals),
            median: round_to(self.median, decimals),
            q3: round_to(self.q3, decimals),
            ..*self
        }
    }
}

/// Statistics of every numeric field over one row set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub sample_count: usize,
    pub scope: AggregationScope,
    pub resample: Option<ResampleInterval>,
    pub fields: Vec<FieldSummary>,
}

impl SummaryStatistics {
    pub fn get(&self, field: Field) -> Option<&FieldSummary> {
        self.fields.iter().find(|s| s.field == field)
    }

    /// Record which row set the statistics describe
    pub fn with_scope(
        mut self,
        scope: AggregationScope,
        resample: Option<ResampleInterval>,
    ) -> Self {
        self.scope = scope;
        self.resample = resample;
        self
    }

    /// Copy with every statistic rounded for display; counts are untouched
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            fields: self.fields.iter().map(|f| f.rounded(decimals)).collect(),
            ..self.clone()
        }
    }
}

/// Summarize every numeric field of `rows`
///
/// Fails with an empty-dataset error when there are no rows.
pub fn summarize<R: NumericRow>(rows: &[R]) -> Result<SummaryStatistics> {
    if rows.is_empty() {
        return Err(PumpError::empty_dataset(
            "no rows left to summarize after cleaning and scope selection",
        ));
    }

    let fields = Field::ALL
        .iter()
        .map(|&field| {
            let mut values: Vec<f64> = rows.iter().map(|r| r.value(field)).collect();
            FieldSummary::from_values(field, &mut values)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SummaryStatistics {
        sample_count: rows.len(),
        scope: AggregationScope::All,
        resample: None,
        fields,
    })
}

/// Sort `values` ascending and sum them in that order
///
/// Floating-point addition is not associative; summing a canonical order
/// makes means independent of the order rows arrived in.
pub fn ordered_sum(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

/// Sample standard deviation of sorted values around `mean`
fn sample_std_dev(sorted: &[f64], mean: f64) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let mut squares: Vec<f64> = sorted.iter().map(|v| (v - mean) * (v - mean)).collect();
    (ordered_sum(&mut squares) / (sorted.len() - 1) as f64).sqrt()
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
