//! Ingestion and cleaning of pump sensor extracts
//!
//! Turns delimited text into validated [`Reading`]s. A row is usable only
//! when its timestamp, voltage, current and power all parse; anything else
//! is dropped and counted, never surfaced as a run failure.
//!
//! ## Architecture
//!
//! - [`reader`] - Delimited text reading and schema resolution
//! - [`column_mapping`] - Header name to column index mapping
//! - [`field_parsers`] - Day-first timestamps and comma-decimal numbers
//! - [`stats`] - Row accounting and result structures
//!
//! ## Usage
//!
//! ```rust
//! use pump_processor::cleaner::{clean, read_raw_readings};
//! use pump_processor::config::ColumnSchema;
//!
//! # fn example() -> pump_processor::Result<()> {
//! let csv = "data,tensao_saida,corrente,potencia\n01/02/2024 10:00,380,30,\"15,0\"\n";
//! let raw = read_raw_readings(csv.as_bytes(), &ColumnSchema::default(), b',')?;
//! let cleaned = clean(&raw);
//!
//! assert_eq!(cleaned.stats.usable, 1);
//! # Ok(())
//! # }
//! ```

pub mod column_mapping;
pub mod field_parsers;
pub mod reader;
pub mod stats;


pub use column_mapping::ColumnMapping;
pub use field_parsers::{parse_day_first_timestamp, parse_decimal, parse_reading};
pub use reader::{read_raw_file, read_raw_readings};
pub use stats::{CleanedDataset, CleaningStats};

use crate::config::ColumnSchema;
use crate::error::Result;
use crate::models::{RawReading, Reading};
use std::path::Path;
use tracing::{debug, info};

/// Clean raw rows into readings, preserving source order
///
/// Pure: the same input always yields the same readings and statistics.
pub fn clean(raw_records: &[RawReading]) -> CleanedDataset {
    let mut readings: Vec<Reading> = Vec::with_capacity(raw_records.len());
    let mut stats = CleaningStats::new();

    for raw in raw_records {
        match parse_reading(raw) {
            Ok(reading) => {
                readings.push(reading);
                stats.record_usable();
            }
            Err(malformed) => {
                debug!("Dropping row: {}", malformed);
                stats.record_malformed(&malformed);
            }
        }
    }

    info!("Cleaning complete: {}", stats.summary());

    CleanedDataset { readings, stats }
}

/// Read and clean a delimited file in one step
pub fn clean_file(path: &Path, schema: &ColumnSchema, delimiter: u8) -> Result<CleanedDataset> {
    info!("Reading pump extract: {}", path.display());
    let raw = read_raw_file(path, schema, delimiter)?;
    Ok(clean(&raw))
}
