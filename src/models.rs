//! Core data structures and types for pump processing.
//!
//! Defines the raw and cleaned reading records, the derived electrical
//! record, and the numeric field catalogue shared by resampling, statistics
//! and export.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One source row as received, before any parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReading {
    /// 1-based line number in the source file (header is line 1)
    pub line: usize,
    pub timestamp_text: String,
    pub voltage_text: String,
    pub current_text: String,
    pub power_text: String,
}

impl RawReading {
    pub fn new(
        line: usize,
        timestamp_text: impl Into<String>,
        voltage_text: impl Into<String>,
        current_text: impl Into<String>,
        power_text: impl Into<String>,
    ) -> Self {
        Self {
            line,
            timestamp_text: timestamp_text.into(),
            voltage_text: voltage_text.into(),
            current_text: current_text.into(),
            power_text: power_text.into(),
        }
    }
}

/// A cleaned reading; every field parsed and finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub voltage_v: f64,
    pub current_a: f64,
    pub active_power_kw: f64,
}

impl Reading {
    pub fn new(
        timestamp: NaiveDateTime,
        voltage_v: f64,
        current_a: f64,
        active_power_kw: f64,
    ) -> Self {
        Self {
            timestamp,
            voltage_v,
            current_a,
            active_power_kw,
        }
    }
}

/// How the power factor of a derived record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerFactorStatus {
    /// Ratio P/S was already inside [0, 1]
    Measured,
    /// Ratio P/S fell outside [0, 1] and was capped
    Clipped,
    /// Apparent power at or below epsilon; power factor defined as 0
    DegenerateApparentPower,
}

impl PowerFactorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerFactorStatus::Measured => "measured",
            PowerFactorStatus::Clipped => "clipped",
            PowerFactorStatus::DegenerateApparentPower => "degenerate_apparent_power",
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, PowerFactorStatus::DegenerateApparentPower)
    }
}

/// A cleaned reading with its derived electrical quantities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedReading {
    pub timestamp: NaiveDateTime,
    pub voltage_v: f64,
    pub current_a: f64,
    /// Power column as read from the source
    pub measured_active_power_kw: f64,
    /// Active power used downstream; corrected in mean-ratio mode
    pub active_power_kw: f64,
    pub apparent_power_kva: f64,
    pub power_factor: f64,
    pub power_factor_status: PowerFactorStatus,
    pub reactive_power_kvar: f64,
    pub load_percent: f64,
}

impl DerivedReading {
    /// The cleaned reading this record was derived from
    pub fn reading(&self) -> Reading {
        Reading::new(
            self.timestamp,
            self.voltage_v,
            self.current_a,
            self.measured_active_power_kw,
        )
    }
}

/// Numeric fields carried by derived and resampled rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    VoltageV,
    CurrentA,
    MeasuredActivePowerKw,
    ActivePowerKw,
    ApparentPowerKva,
    PowerFactor,
    ReactivePowerKvar,
    LoadPercent,
}

impl Field {
    /// Every numeric field, in export column order
    pub const ALL: [Field; 8] = [
        Field::VoltageV,
        Field::CurrentA,
        Field::MeasuredActivePowerKw,
        Field::ActivePowerKw,
        Field::ApparentPowerKva,
        Field::PowerFactor,
        Field::ReactivePowerKvar,
        Field::LoadPercent,
    ];

    /// Column name used in exported tables
    pub fn column_name(&self) -> &'static str {
        match self {
            Field::VoltageV => "voltage_v",
            Field::CurrentA => "current_a",
            Field::MeasuredActivePowerKw => "measured_active_power_kw",
            Field::ActivePowerKw => "active_power_kw",
            Field::ApparentPowerKva => "apparent_power_kva",
            Field::PowerFactor => "power_factor",
            Field::ReactivePowerKvar => "reactive_power_kvar",
            Field::LoadPercent => "load_percent",
        }
    }

    /// Human-readable label with unit
    pub fn label(&self) -> &'static str {
        match self {
            Field::VoltageV => "Voltage (V)",
            Field::CurrentA => "Current (A)",
            Field::MeasuredActivePowerKw => "Measured Active Power (kW)",
            Field::ActivePowerKw => "Active Power (kW)",
            Field::ApparentPowerKva => "Apparent Power (kVA)",
            Field::PowerFactor => "Power Factor",
            Field::ReactivePowerKvar => "Reactive Power (kVAr)",
            Field::LoadPercent => "Load (%)",
        }
    }
}

/// A timestamped row exposing the numeric fields.
///
/// Implemented by derived and resampled rows so that statistics and export
/// work over either.
pub trait NumericRow {
    fn timestamp(&self) -> NaiveDateTime;
    fn value(&self, field: Field) -> f64;
}

impl NumericRow for DerivedReading {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
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
