//! Configuration management and validation.
//!
//! Provides the immutable run configuration: column schema, nameplate data,
//! the explicit voltage policy and processing mode selectors, operating-state
//! thresholds, aggregation scope and resampling options.

use crate::constants::{
    DEFAULT_APPARENT_POWER_EPSILON_KVA, DEFAULT_CURRENT_COLUMN, DEFAULT_DELIMITER,
    DEFAULT_DISPLAY_PRECISION, DEFAULT_LINE_VOLTAGE_V, DEFAULT_POWER_COLUMN,
    DEFAULT_TIMESTAMP_COLUMN, DEFAULT_VOLTAGE_COLUMN, MAX_DISPLAY_PRECISION,
};
use crate::error::{PumpError, Result};
use crate::nameplate::{EquipmentDatasheet, NameplateRating};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Source header names of the four required columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub timestamp: String,
    pub voltage: String,
    pub current: String,
    pub power: String,
}

impl ColumnSchema {
    pub fn new(
        timestamp: impl Into<String>,
        voltage: impl Into<String>,
        current: impl Into<String>,
        power: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            voltage: voltage.into(),
            current: current.into(),
            power: power.into(),
        }
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::new(
            DEFAULT_TIMESTAMP_COLUMN,
            DEFAULT_VOLTAGE_COLUMN,
            DEFAULT_CURRENT_COLUMN,
            DEFAULT_POWER_COLUMN,
        )
    }
}

/// Which voltage feeds the apparent power formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoltagePolicy {
    /// Per-record measured line voltage
    #[default]
    Measured,
    /// A fixed line voltage, for extracts without a reliable voltage column
    Fixed { line_voltage_v: f64 },
}

impl VoltagePolicy {
    /// Voltage to use for a record whose measured voltage is `measured_v`
    pub fn line_voltage(&self, measured_v: f64) -> f64 {
        match self {
            VoltagePolicy::Measured => measured_v,
            VoltagePolicy::Fixed { line_voltage_v } => *line_voltage_v,
        }
    }
}

impl fmt::Display for VoltagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoltagePolicy::Measured => write!(f, "measured"),
            VoltagePolicy::Fixed { line_voltage_v } => write!(f, "fixed ({} V)", line_voltage_v),
        }
    }
}

impl FromStr for VoltagePolicy {
    type Err = PumpError;

    /// `fixed` selects the plate line voltage; callers override it afterwards
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "measured" => Ok(VoltagePolicy::Measured),
            "fixed" => Ok(VoltagePolicy::Fixed {
                line_voltage_v: DEFAULT_LINE_VOLTAGE_V,
            }),
            other => Err(PumpError::configuration(format!(
                "unknown voltage policy '{}' (expected 'measured' or 'fixed')",
                other
            ))),
        }
    }
}

/// How active power and power factor are obtained from the power column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    /// Per-record ratio of measured power to apparent power
    #[default]
    Direct,
    /// Estimate the dataset mean power factor, then recompute active power
    /// as apparent power times that mean
    MeanRatio,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Direct => "direct",
            ProcessingMode::MeanRatio => "mean-ratio",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = PumpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(ProcessingMode::Direct),
            "mean-ratio" | "mean_ratio" => Ok(ProcessingMode::MeanRatio),
            other => Err(PumpError::configuration(format!(
                "unknown processing mode '{}' (expected 'direct' or 'mean-ratio')",
                other
            ))),
        }
    }
}

/// Minimum values a reading must meet to count as "operating".
/// Thresholds are inclusive; `None` disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingThresholds {
    pub min_active_power_kw: Option<f64>,
    pub min_voltage_v: Option<f64>,
}

impl OperatingThresholds {
    pub fn is_configured(&self) -> bool {
        self.min_active_power_kw.is_some() || self.min_voltage_v.is_some()
    }
}

/// Which rows statistics are computed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationScope {
    #[default]
    All,
    OperatingOnly,
}

impl fmt::Display for AggregationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationScope::All => write!(f, "all"),
            AggregationScope::OperatingOnly => write!(f, "operating-only"),
        }
    }
}

/// Bucket width for time aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleInterval {
    /// Buckets of `n` minutes, aligned to the Unix epoch
    Minutes(u32),
    Hourly,
    Daily,
}

impl fmt::Display for ResampleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResampleInterval::Minutes(n) => write!(f, "{}min", n),
            ResampleInterval::Hourly => write!(f, "hourly"),
            ResampleInterval::Daily => write!(f, "daily"),
        }
    }
}

impl FromStr for ResampleInterval {
    type Err = PumpError;

    /// Accepts `hourly`, `daily` or `<n>min`
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "hourly" | "1h" => Ok(ResampleInterval::Hourly),
            "daily" | "1d" => Ok(ResampleInterval::Daily),
            other => other
                .strip_suffix("min")
                .and_then(|n| n.parse::<u32>().ok())
                .map(ResampleInterval::Minutes)
                .ok_or_else(|| {
                    PumpError::configuration(format!(
                        "unknown resample interval '{}' (expected 'hourly', 'daily' or '<n>min')",
                        s
                    ))
                }),
        }
    }
}

/// What to emit for buckets that received no records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Empty buckets produce no row
    #[default]
    Skip,
    /// Empty buckets produce a row with every field set to this value
    Value(f64),
}

/// Resampling request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    pub interval: ResampleInterval,
    #[serde(default)]
    pub fill: FillPolicy,
}

/// Global configuration for a pump processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Header names of the required columns
    pub schema: ColumnSchema,

    /// Field delimiter of the source file
    pub delimiter: char,

    /// Motor rating used for load percentages
    pub nameplate: NameplateRating,

    /// Plate text exported for the renderers
    pub datasheet: EquipmentDatasheet,

    /// Voltage source for apparent power
    pub voltage_policy: VoltagePolicy,

    /// Direct or mean-ratio processing
    pub mode: ProcessingMode,

    /// Apparent power at or below which power factor is defined as 0 (kVA)
    pub apparent_power_epsilon_kva: f64,

    /// Operating-state classification
    pub operating: OperatingThresholds,

    /// Rows the statistics are computed over
    pub scope: AggregationScope,

    /// Optional time bucketing applied before statistics
    pub resample: Option<ResampleConfig>,

    /// Decimal places of exported statistics
    pub display_precision: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema: ColumnSchema::default(),
            delimiter: DEFAULT_DELIMITER,
            nameplate: NameplateRating::default(),
            datasheet: EquipmentDatasheet::default(),
            voltage_policy: VoltagePolicy::default(),
            mode: ProcessingMode::default(),
            apparent_power_epsilon_kva: DEFAULT_APPARENT_POWER_EPSILON_KVA,
            operating: OperatingThresholds::default(),
            scope: AggregationScope::default(),
            resample: None,
            display_precision: DEFAULT_DISPLAY_PRECISION,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PumpError::configuration(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PumpError::configuration(format!(
                "invalid config file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Set the column schema
    pub fn with_schema(mut self, schema: ColumnSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the nameplate rating
    pub fn with_nameplate(mut self, nameplate: NameplateRating) -> Self {
        self.nameplate = nameplate;
        self
    }

    /// Set the voltage policy
    pub fn with_voltage_policy(mut self, policy: VoltagePolicy) -> Self {
        self.voltage_policy = policy;
        self
    }

    /// Set the processing mode
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the degenerate apparent power threshold
    pub fn with_epsilon(mut self, epsilon_kva: f64) -> Self {
        self.apparent_power_epsilon_kva = epsilon_kva;
        self
    }

    /// Set operating-state thresholds
    pub fn with_operating_thresholds(mut self, thresholds: OperatingThresholds) -> Self {
        self.operating = thresholds;
        self
    }

    /// Set the aggregation scope
    pub fn with_scope(mut self, scope: AggregationScope) -> Self {
        self.scope = scope;
        self
    }

    /// Request time bucketing before statistics
    pub fn with_resample(mut self, interval: ResampleInterval, fill: FillPolicy) -> Self {
        self.resample = Some(ResampleConfig { interval, fill });
        self
    }

    /// Set display precision of exported statistics
    pub fn with_display_precision(mut self, decimals: u32) -> Self {
        self.display_precision = decimals;
        self
    }

    /// Delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(PumpError::configuration(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )))
        }
    }

    /// Validate the configuration before a run
    pub fn validate(&self) -> Result<()> {
        self.nameplate.validate()?;
        self.delimiter_byte()?;

        for (label, name) in [
            ("timestamp", &self.schema.timestamp),
            ("voltage", &self.schema.voltage),
            ("current", &self.schema.current),
            ("power", &self.schema.power),
        ] {
            if name.trim().is_empty() {
                return Err(PumpError::configuration(format!(
                    "column name for {} is empty",
                    label
                )));
            }
        }

        if !self.apparent_power_epsilon_kva.is_finite() || self.apparent_power_epsilon_kva < 0.0 {
            return Err(PumpError::configuration(format!(
                "apparent power epsilon must be a non-negative number, got {}",
                self.apparent_power_epsilon_kva
            )));
        }

        if let VoltagePolicy::Fixed { line_voltage_v } = self.voltage_policy {
            if !line_voltage_v.is_finite() || line_voltage_v <= 0.0 {
                return Err(PumpError::configuration(format!(
                    "fixed line voltage must be positive, got {} V",
                    line_voltage_v
                )));
            }
        }

        for (label, threshold) in [
            ("minimum active power", self.operating.min_active_power_kw),
            ("minimum voltage", self.operating.min_voltage_v),
        ] {
            if threshold.is_some_and(|t| !t.is_finite()) {
                return Err(PumpError::configuration(format!(
                    "{} threshold must be finite",
                    label
                )));
            }
        }

        if self.display_precision > MAX_DISPLAY_PRECISION {
            return Err(PumpError::configuration(format!(
                "display precision must be at most {} decimals, got {}",
                MAX_DISPLAY_PRECISION, self.display_precision
            )));
        }

        if self.scope == AggregationScope::OperatingOnly && !self.operating.is_configured() {
            return Err(PumpError::configuration(
                "operating-only scope requires a minimum active power or minimum voltage threshold",
            ));
        }

        if let Some(resample) = &self.resample {
            if resample.interval == ResampleInterval::Minutes(0) {
                return Err(PumpError::configuration(
                    "resample interval must be at least one minute",
                ));
            }
            if let FillPolicy::Value(v) = resample.fill {
                if !v.is_finite() {
                    return Err(PumpError::configuration("fill value must be finite"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode, ProcessingMode::Direct);
        assert_eq!(config.voltage_policy, VoltagePolicy::Measured);
        assert_eq!(config.schema.timestamp, "data");
        assert_eq!(config.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn test_processing_mode_from_str() {
        assert_eq!(
            "direct".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::Direct
        );
        assert_eq!(
            "Mean-Ratio".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::MeanRatio
        );
        assert_eq!(
            "mean_ratio".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::MeanRatio
        );

        let err = "average".parse::<ProcessingMode>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("average"));
    }

    #[test]
    fn test_voltage_policy_from_str() {
        assert_eq!(
            "measured".parse::<VoltagePolicy>().unwrap(),
            VoltagePolicy::Measured
        );
        assert_eq!(
            "fixed".parse::<VoltagePolicy>().unwrap(),
            VoltagePolicy::Fixed {
                line_voltage_v: 440.0
            }
        );
        assert!("nominal".parse::<VoltagePolicy>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_voltage_policy_line_voltage() {
        assert_eq!(VoltagePolicy::Measured.line_voltage(381.5), 381.5);
        let fixed = VoltagePolicy::Fixed {
            line_voltage_v: 440.0,
        };
        assert_eq!(fixed.line_voltage(381.5), 440.0);
        assert_eq!(fixed.to_string(), "fixed (440 V)");
    }

    #[test]
    fn test_resample_interval_from_str() {
        assert_eq!(
            "daily".parse::<ResampleInterval>().unwrap(),
            ResampleInterval::Daily
        );
        assert_eq!(
            "hourly".parse::<ResampleInterval>().unwrap(),
            ResampleInterval::Hourly
        );
        assert_eq!(
            "15min".parse::<ResampleInterval>().unwrap(),
            ResampleInterval::Minutes(15)
        );
        assert!("weekly".parse::<ResampleInterval>().is_err());
    }

    #[test]
    fn test_operating_scope_requires_thresholds() {
        let config = PipelineConfig::default().with_scope(AggregationScope::OperatingOnly);
        assert!(config.validate().unwrap_err().is_configuration());

        let config = config.with_operating_thresholds(OperatingThresholds {
            min_active_power_kw: Some(1.0),
            min_voltage_v: None,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let fixed_zero = PipelineConfig::default().with_voltage_policy(VoltagePolicy::Fixed {
            line_voltage_v: 0.0,
        });
        assert!(fixed_zero.validate().is_err());

        let negative_epsilon = PipelineConfig::default().with_epsilon(-1.0);
        assert!(negative_epsilon.validate().is_err());

        let zero_minutes =
            PipelineConfig::default().with_resample(ResampleInterval::Minutes(0), FillPolicy::Skip);
        assert!(zero_minutes.validate().is_err());

        let nan_fill = PipelineConfig::default()
            .with_resample(ResampleInterval::Daily, FillPolicy::Value(f64::NAN));
        assert!(nan_fill.validate().is_err());

        let wide_delimiter = PipelineConfig::default().with_delimiter('§');
        assert!(wide_delimiter.validate().is_err());

        let mut bad_nameplate = PipelineConfig::default();
        bad_nameplate.nameplate.rated_efficiency = 0.0;
        assert!(bad_nameplate.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_display_precision_bound() {
        let widest = PipelineConfig::default().with_display_precision(MAX_DISPLAY_PRECISION);
        assert!(widest.validate().is_ok());

        let too_wide = PipelineConfig::default().with_display_precision(MAX_DISPLAY_PRECISION + 1);
        assert!(too_wide.validate().unwrap_err().is_configuration());

        let overflowing = PipelineConfig::default().with_display_precision(400);
        assert!(overflowing.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_config_from_json_file_with_partial_keys() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "mode": "mean-ratio",
                "voltage_policy": {{ "kind": "fixed", "line_voltage_v": 380.0 }},
                "delimiter": ";",
                "operating": {{ "min_active_power_kw": 0.5 }},
                "scope": "operating_only",
                "resample": {{ "interval": "daily", "fill": {{ "value": 0.0 }} }}
            }}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.mode, ProcessingMode::MeanRatio);
        assert_eq!(
            config.voltage_policy,
            VoltagePolicy::Fixed {
                line_voltage_v: 380.0
            }
        );
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.operating.min_active_power_kw, Some(0.5));
        assert_eq!(config.operating.min_voltage_v, None);
        assert_eq!(config.scope, AggregationScope::OperatingOnly);
        assert_eq!(
            config.resample,
            Some(ResampleConfig {
                interval: ResampleInterval::Daily,
                fill: FillPolicy::Value(0.0),
            })
        );
        assert_eq!(config.schema, ColumnSchema::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_file_rejects_unknown_mode() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "mode": "median" }}"#).unwrap();

        let err = PipelineConfig::from_json_file(file.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = PipelineConfig::from_json_file(Path::new("/nonexistent/pump.json")).unwrap_err();
        assert!(err.is_configuration());
    }
}
