//! Cleaning statistics and result structures
//!
//! Tracks how many rows were read, kept and dropped (with a per-field
//! breakdown) so the run can report data loss instead of hiding it.

use crate::constants::MAX_MALFORMED_SAMPLES;
use crate::error::{MalformedRowError, RawField};
use crate::models::Reading;

/// Cleaned readings together with the statistics of the cleaning pass
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    /// Usable readings, in source order
    pub readings: Vec<Reading>,

    /// Row accounting for diagnostics
    pub stats: CleaningStats,
}

impl CleanedDataset {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Row accounting of a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CleaningStats {
    /// Rows presented to the cleaner
    pub rows_read: usize,

    /// Rows that became readings
    pub usable: usize,

    /// Rows dropped because a required field failed to parse
    pub dropped: usize,

    /// Drops whose first failing field was the timestamp
    pub dropped_timestamp: usize,

    /// Drops whose first failing field was the voltage
    pub dropped_voltage: usize,

    /// Drops whose first failing field was the current
    pub dropped_current: usize,

    /// Drops whose first failing field was the power
    pub dropped_power: usize,

    /// First few malformed rows, for debugging
    pub malformed_samples: Vec<String>,
}

impl CleaningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a usable row
    pub fn record_usable(&mut self) {
        self.rows_read += 1;
        self.usable += 1;
    }

    /// Record a dropped row
    pub fn record_malformed(&mut self, error: &MalformedRowError) {
        self.rows_read += 1;
        self.dropped += 1;
        match error.field {
            RawField::Timestamp => self.dropped_timestamp += 1,
            RawField::Voltage => self.dropped_voltage += 1,
            RawField::Current => self.dropped_current += 1,
            RawField::Power => self.dropped_power += 1,
        }
        if self.malformed_samples.len() < MAX_MALFORMED_SAMPLES {
            self.malformed_samples.push(error.to_string());
        }
    }

    /// Drop count for one field
    pub fn dropped_for(&self, field: RawField) -> usize {
        match field {
            RawField::Timestamp => self.dropped_timestamp,
            RawField::Voltage => self.dropped_voltage,
            RawField::Current => self.dropped_current,
            RawField::Power => self.dropped_power,
        }
    }

    /// Percentage of rows kept
    pub fn usable_rate(&self) -> f64 {
        if self.rows_read == 0 {
            0.0
        } else {
            (self.usable as f64 / self.rows_read as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} rows read, {} usable ({:.1}%), {} dropped \
             (timestamp: {}, voltage: {}, current: {}, power: {})",
            self.rows_read,
            self.usable,
            self.usable_rate(),
            self.dropped,
            self.dropped_timestamp,
            self.dropped_voltage,
            self.dropped_current,
            self.dropped_power
        )
    }
}
