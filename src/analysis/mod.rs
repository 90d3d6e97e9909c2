//! Electrical analysis of cleaned readings
//!
//! - [`electrical`] - Per-record formulas: apparent power, power factor,
//!   reactive power and load percentage
//! - [`derive`] - Direct and mean-ratio derivation over a dataset
//! - [`operating`] - Operating-state thresholds and aggregation scope
//! - [`resample`] - Epoch-aligned time bucketing
//! - [`summary`] - Order-independent descriptive statistics

pub mod derive;
pub mod electrical;
pub mod operating;
pub mod resample;
pub mod summary;

pub use derive::{
    DerivationOptions, DerivationOutput, DerivationStats, MeanPowerFactorEstimate, derive,
    estimate_mean_power_factor,
};
pub use operating::{is_operating, operating_count, select_scope};
pub use resample::{ResampledReading, bucket_start, resample};
pub use summary::{FieldSummary, SummaryStatistics, summarize};
