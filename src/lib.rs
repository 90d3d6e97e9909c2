//! Pump Processor Library
//!
//! Cleans sensor extracts from a motor-driven pump and derives the
//! electrical quantities an energy-efficiency diagnosis needs.
//!
//! This library provides tools for:
//! - Reading delimited extracts with day-first timestamps and comma decimals
//! - Dropping and accounting for malformed rows
//! - Deriving apparent power, power factor, reactive power and nameplate loading
//! - Direct and mean-ratio processing modes with an explicit voltage policy
//! - Operating-state filtering, time resampling and summary statistics
//! - Exporting Parquet and JSON artifacts for downstream renderers

pub mod analysis;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod models;
pub mod nameplate;
pub mod processor;

pub use analysis::{SummaryStatistics, derive, summarize};
pub use cleaner::{CleanedDataset, CleaningStats, clean};
pub use config::{PipelineConfig, ProcessingMode, VoltagePolicy};
pub use error::{MalformedRowError, PumpError, Result};
pub use models::{DerivedReading, Field, RawReading, Reading};
pub use nameplate::NameplateRating;
pub use processor::{ProcessingReport, PumpProcessor, run_pipeline};
