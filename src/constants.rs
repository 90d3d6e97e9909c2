//! Application constants for the pump processor
//!
//! Default column names, nameplate values, derivation thresholds and output
//! file names used throughout the pipeline.

// =============================================================================
// Source Columns
// =============================================================================

/// Default header of the timestamp column
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "data";

/// Default header of the measured line voltage column
pub const DEFAULT_VOLTAGE_COLUMN: &str = "tensao_saida";

/// Default header of the line current column
pub const DEFAULT_CURRENT_COLUMN: &str = "corrente";

/// Default header of the measured active power column
pub const DEFAULT_POWER_COLUMN: &str = "potencia";

/// Default field delimiter of the source extract
pub const DEFAULT_DELIMITER: char = ',';

// =============================================================================
// Timestamp Layouts
// =============================================================================

/// Day-first layouts with a two-digit year (`dd/mm/yy`), tried first.
/// Years 00-68 map to 20xx and 69-99 to 19xx.
pub const DAY_FIRST_SHORT_YEAR_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M:%S%.f",
    "%d/%m/%y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M:%S%.f",
    "%d-%m-%y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M:%S%.f",
    "%d.%m.%y %H:%M",
];

/// Day-first date/time layouts with a four-digit year
pub const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

/// Year-first layouts; unambiguous, accepted alongside day-first input
pub const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts, interpreted as midnight
pub const DATE_ONLY_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d",
];

/// Smallest year accepted from a four-digit year field
pub const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

// =============================================================================
// Electrical Defaults
// =============================================================================

/// Rated mechanical output of the surveyed motor (kW)
pub const DEFAULT_RATED_OUTPUT_POWER_KW: f64 = 15.0;

/// Rated efficiency of the surveyed motor (fraction)
pub const DEFAULT_RATED_EFFICIENCY: f64 = 0.924;

/// Line voltage from the motor plate, used by the fixed voltage policy (V)
pub const DEFAULT_LINE_VOLTAGE_V: f64 = 440.0;

/// Apparent power at or below which a record counts as "no current flow" (kVA)
pub const DEFAULT_APPARENT_POWER_EPSILON_KVA: f64 = 1e-6;

/// Upper bound of a physically meaningful power factor
pub const MAX_POWER_FACTOR: f64 = 1.0;

/// Lower bound of a physically meaningful power factor
pub const MIN_POWER_FACTOR: f64 = 0.0;

// =============================================================================
// Reporting and Output
// =============================================================================

/// Decimal places applied to statistics handed to the table renderers
pub const DEFAULT_DISPLAY_PRECISION: u32 = 2;

/// Largest number of empty buckets a value fill may create in one run
pub const MAX_FILLED_BUCKETS: i64 = 1_000_000;

/// Filled-to-populated bucket ratio above which a fill is logged as suspicious
pub const FILL_WARN_RATIO: i64 = 10;

/// Largest display precision; beyond this f64 has no meaningful digits left
pub const MAX_DISPLAY_PRECISION: u32 = 15;

/// Number of malformed row messages kept for diagnostics
pub const MAX_MALFORMED_SAMPLES: usize = 10;

/// Derived reading sequence
pub const DERIVED_PARQUET_FILENAME: &str = "derived.parquet";

/// CSV copy of the derived reading sequence
pub const DERIVED_CSV_FILENAME: &str = "derived.csv";

/// Time-bucketed projection of the derived sequence
pub const RESAMPLED_PARQUET_FILENAME: &str = "resampled.parquet";

/// Rounded summary statistics
pub const SUMMARY_JSON_FILENAME: &str = "summary.json";

/// Nameplate rating and equipment datasheet
pub const NAMEPLATE_JSON_FILENAME: &str = "nameplate.json";

/// Default output directory name, created beside the input file
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "pump_report";

/// Round a value to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
