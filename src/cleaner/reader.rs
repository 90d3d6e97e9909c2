//! Delimited text reader for pump extracts
//!
//! Reads the header, resolves the column schema and yields one
//! [`RawReading`] per data row. Invalid UTF-8 is replaced rather than
//! rejected so that a bad byte only spoils the row it sits in.

use super::column_mapping::ColumnMapping;
use crate::config::ColumnSchema;
use crate::error::{PumpError, Result};
use crate::models::RawReading;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read raw readings from any delimited text source
pub fn read_raw_readings<R: Read>(
    source: R,
    schema: &ColumnSchema,
    delimiter: u8,
) -> Result<Vec<RawReading>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = string_record(reader.byte_headers()?);
    let mapping = ColumnMapping::resolve(&headers, schema)?;
    debug!(
        "Resolved columns from {}-column header: timestamp={}, voltage={}, current={}, power={}",
        mapping.column_count(),
        mapping.timestamp,
        mapping.voltage,
        mapping.current,
        mapping.power
    );

    let mut raw_readings = Vec::new();
    for result in reader.byte_records() {
        let record = result?;
        // The header occupies line 1
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(raw_readings.len() + 2);
        raw_readings.push(mapping.extract(&string_record(&record), line));
    }

    debug!("Read {} raw rows", raw_readings.len());
    Ok(raw_readings)
}

/// Read raw readings from a file on disk
pub fn read_raw_file(path: &Path, schema: &ColumnSchema, delimiter: u8) -> Result<Vec<RawReading>> {
    if !path.exists() {
        return Err(PumpError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    read_raw_readings(file, schema, delimiter)
}

fn string_record(record: &csv::ByteRecord) -> StringRecord {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "data,potencia,tensao_saida,corrente\n\
                          01/02/2024 10:00,\"15,2\",\"380,5\",30\n\
                          01/02/2024 10:05,15.4,381,\"30,2\"\n";

    #[test]
    fn test_reads_quoted_comma_decimals() {
        let raw = read_raw_readings(SAMPLE.as_bytes(), &ColumnSchema::default(), b',').unwrap();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].line, 2);
        assert_eq!(raw[0].power_text, "15,2");
        assert_eq!(raw[0].voltage_text, "380,5");
        assert_eq!(raw[1].line, 3);
        assert_eq!(raw[1].current_text, "30,2");
    }

    #[test]
    fn test_semicolon_delimiter() {
        let content = "data;tensao_saida;corrente;potencia\n01/02/2024 10:00;380,5;30;15,2\n";
        let raw = read_raw_readings(content.as_bytes(), &ColumnSchema::default(), b';').unwrap();

        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].voltage_text, "380,5");
        assert_eq!(raw[0].power_text, "15,2");
    }

    #[test]
    fn test_short_rows_are_kept_as_raw() {
        let content = "data,tensao_saida,corrente,potencia\n01/02/2024 10:00,380\n";
        let raw = read_raw_readings(content.as_bytes(), &ColumnSchema::default(), b',').unwrap();

        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].current_text, "");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut content = b"data,tensao_saida,corrente,potencia\n01/02/2024 10:00,38".to_vec();
        content.push(0xFF);
        content.extend_from_slice(b",30,15\n");

        let raw = read_raw_readings(content.as_slice(), &ColumnSchema::default(), b',').unwrap();
        assert_eq!(raw.len(), 1);
        assert!(raw[0].voltage_text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_missing_header_column() {
        let content = "data,tensao,corrente,potencia\n";
        let err =
            read_raw_readings(content.as_bytes(), &ColumnSchema::default(), b',').unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_file() {
        let err = read_raw_file(
            Path::new("/nonexistent/bomba.csv"),
            &ColumnSchema::default(),
            b',',
        )
        .unwrap_err();
        assert!(matches!(err, PumpError::InputNotFound { .. }));
    }
}
