//! Column mapping for the pump extract
//!
//! Resolves the configured header names of the four required columns to
//! positions in the file and pulls the raw text of each row through them.

use crate::config::ColumnSchema;
use crate::error::{PumpError, Result};
use crate::models::RawReading;
use csv::StringRecord;
use std::collections::HashMap;

/// Positions of the required columns within a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Column name to index mapping for every header in the file
    pub name_to_index: HashMap<String, usize>,

    pub timestamp: usize,
    pub voltage: usize,
    pub current: usize,
    pub power: usize,
}

impl ColumnMapping {
    /// Resolve the schema against a header row
    ///
    /// Header names are trimmed and a leading byte-order mark is ignored.
    /// Extra columns are kept in `name_to_index` but otherwise unused.
    pub fn resolve(headers: &StringRecord, schema: &ColumnSchema) -> Result<Self> {
        let mut name_to_index = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let column_name = header.trim_start_matches('\u{feff}').trim().to_string();
            name_to_index.entry(column_name).or_insert(index);
        }

        let lookup = |name: &str| -> Result<usize> {
            name_to_index.get(name.trim()).copied().ok_or_else(|| {
                let mut available: Vec<_> = name_to_index.keys().cloned().collect();
                available.sort();
                PumpError::configuration(format!(
                    "required column '{}' not found in header (available: {})",
                    name,
                    available.join(", ")
                ))
            })
        };

        let timestamp = lookup(&schema.timestamp)?;
        let voltage = lookup(&schema.voltage)?;
        let current = lookup(&schema.current)?;
        let power = lookup(&schema.power)?;

        Ok(Self {
            name_to_index,
            timestamp,
            voltage,
            current,
            power,
        })
    }

    /// Extract the raw text of the four required fields; missing cells are empty
    pub fn extract(&self, record: &StringRecord, line: usize) -> RawReading {
        let cell = |index: usize| record.get(index).unwrap_or("").to_string();
        RawReading::new(
            line,
            cell(self.timestamp),
            cell(self.voltage),
            cell(self.current),
            cell(self.power),
        )
    }

    /// Number of columns in the header
    pub fn column_count(&self) -> usize {
        self.name_to_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn test_resolve_default_schema() {
        let mapping = ColumnMapping::resolve(
            &headers(&["id", "data", "potencia", "tensao_saida", "corrente", "obs"]),
            &ColumnSchema::default(),
        )
        .unwrap();

        assert_eq!(mapping.timestamp, 1);
        assert_eq!(mapping.power, 2);
        assert_eq!(mapping.voltage, 3);
        assert_eq!(mapping.current, 4);
        assert_eq!(mapping.column_count(), 6);
    }

    #[test]
    fn test_resolve_trims_headers_and_bom() {
        let mapping = ColumnMapping::resolve(
            &headers(&["\u{feff}data", " tensao_saida ", "corrente", "potencia"]),
            &ColumnSchema::default(),
        )
        .unwrap();

        assert_eq!(mapping.timestamp, 0);
        assert_eq!(mapping.voltage, 1);
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let err = ColumnMapping::resolve(
            &headers(&["data", "tensao_saida", "potencia"]),
            &ColumnSchema::default(),
        )
        .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("corrente"));
    }

    #[test]
    fn test_custom_schema() {
        let schema = ColumnSchema::new("time", "V", "I", "P");
        let mapping =
            ColumnMapping::resolve(&headers(&["P", "I", "V", "time"]), &schema).unwrap();

        let record = StringRecord::from(vec!["15,2", "30", "380", "01/02/2024 10:00"]);
        let raw = mapping.extract(&record, 2);

        assert_eq!(raw.line, 2);
        assert_eq!(raw.timestamp_text, "01/02/2024 10:00");
        assert_eq!(raw.voltage_text, "380");
        assert_eq!(raw.current_text, "30");
        assert_eq!(raw.power_text, "15,2");
    }

    #[test]
    fn test_extract_short_record_yields_empty_cells() {
        let mapping = ColumnMapping::resolve(
            &headers(&["data", "tensao_saida", "corrente", "potencia"]),
            &ColumnSchema::default(),
        )
        .unwrap();

        let raw = mapping.extract(&StringRecord::from(vec!["01/02/2024 10:00", "380"]), 3);
        assert_eq!(raw.current_text, "");
        assert_eq!(raw.power_text, "");
    }
}
