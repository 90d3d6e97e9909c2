//! Nameplate rating and equipment datasheet.
//!
//! The rating feeds the load computation; the datasheet is pass-through
//! plate text exported for the table renderers and never interpreted.

use crate::constants::{DEFAULT_RATED_EFFICIENCY, DEFAULT_RATED_OUTPUT_POWER_KW};
use crate::error::{PumpError, Result};
use serde::{Deserialize, Serialize};

/// Manufacturer rating of the pump motor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameplateRating {
    /// Rated mechanical output (kW)
    pub rated_output_power_kw: f64,
    /// Rated efficiency as a fraction in (0, 1]
    pub rated_efficiency: f64,
}

impl NameplateRating {
    /// Create a validated rating
    pub fn new(rated_output_power_kw: f64, rated_efficiency: f64) -> Result<Self> {
        let rating = Self {
            rated_output_power_kw,
            rated_efficiency,
        };
        rating.validate()?;
        Ok(rating)
    }

    /// Check the rating can produce a finite, positive input power
    pub fn validate(&self) -> Result<()> {
        if !self.rated_output_power_kw.is_finite() || self.rated_output_power_kw <= 0.0 {
            return Err(PumpError::configuration(format!(
                "rated output power must be positive, got {} kW",
                self.rated_output_power_kw
            )));
        }
        if !self.rated_efficiency.is_finite()
            || self.rated_efficiency <= 0.0
            || self.rated_efficiency > 1.0
        {
            return Err(PumpError::configuration(format!(
                "rated efficiency must be in (0, 1], got {}",
                self.rated_efficiency
            )));
        }
        Ok(())
    }

    /// Electrical input power the motor draws at rated output (kW)
    pub fn rated_input_power_kw(&self) -> f64 {
        self.rated_output_power_kw / self.rated_efficiency
    }
}

impl Default for NameplateRating {
    fn default() -> Self {
        Self {
            rated_output_power_kw: DEFAULT_RATED_OUTPUT_POWER_KW,
            rated_efficiency: DEFAULT_RATED_EFFICIENCY,
        }
    }
}

/// One parameter/value line of a plate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasheetEntry {
    pub parameter: String,
    pub value: String,
}

impl DatasheetEntry {
    pub fn new(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// Motor and pump plate data, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentDatasheet {
    pub motor: Vec<DatasheetEntry>,
    pub pump: Vec<DatasheetEntry>,
}

impl EquipmentDatasheet {
    /// Motor rows followed by pump rows
    pub fn rows(&self) -> impl Iterator<Item = &DatasheetEntry> {
        self.motor.iter().chain(self.pump.iter())
    }

    pub fn len(&self) -> usize {
        self.motor.len() + self.pump.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motor.is_empty() && self.pump.is_empty()
    }
}

impl Default for EquipmentDatasheet {
    fn default() -> Self {
        Self {
            motor: vec![
                DatasheetEntry::new("Power", "15 kW (20 CV)"),
                DatasheetEntry::new("Voltage (star)", "440 V"),
                DatasheetEntry::new("Current", "26.3 A"),
                DatasheetEntry::new("Power Factor", "0.81 (ind.)"),
                DatasheetEntry::new("Efficiency", "92.4 %"),
                DatasheetEntry::new("Rated Speed", "1775 rpm"),
                DatasheetEntry::new("Service Factor", "1.15"),
                DatasheetEntry::new("Frame", "160 M"),
                DatasheetEntry::new("Mass", "124 kg"),
            ],
            pump: vec![
                DatasheetEntry::new("Pump Flow", "219.2 m³/h"),
                DatasheetEntry::new("Pump Head", "29.8 m"),
                DatasheetEntry::new("Pump Model", "KSB Meganorm 125-315"),
            ],
        }
    }
}

/// Nameplate table handed to the renderers
#[derive(Debug, Clone, Serialize)]
pub struct NameplateTable {
    pub rating: NameplateRating,
    pub rated_input_power_kw: f64,
    pub datasheet: Vec<DatasheetEntry>,
}

impl NameplateTable {
    pub fn new(rating: &NameplateRating, datasheet: &EquipmentDatasheet) -> Self {
        Self {
            rating: *rating,
            rated_input_power_kw: rating.rated_input_power_kw(),
            datasheet: datasheet.rows().cloned().collect(),
        }
    }
}
