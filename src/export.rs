//! Artifact export for downstream renderers
//!
//! Writes the derived sequence (and its resampled projection) to Parquet
//! through polars, plus JSON documents for the summary statistics and the
//! nameplate table.

use crate::analysis::{ResampledReading, SummaryStatistics};
use crate::constants::{
    DERIVED_CSV_FILENAME, DERIVED_PARQUET_FILENAME, NAMEPLATE_JSON_FILENAME,
    RESAMPLED_PARQUET_FILENAME, SUMMARY_JSON_FILENAME,
};
use crate::error::{PumpError, Result};
use crate::models::{DerivedReading, Field, NumericRow};
use crate::nameplate::NameplateTable;
use polars::prelude::{
    Column, CsvWriter, DataFrame, DataType, ParquetCompression, ParquetWriter,
    SerWriter, StatisticsOptions, TimeUnit,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Paths of every file written by an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedArtifacts {
    pub derived_parquet: PathBuf,
    pub derived_csv: Option<PathBuf>,
    pub resampled_parquet: Option<PathBuf>,
    pub summary_json: PathBuf,
    pub nameplate_json: PathBuf,
}

impl ExportedArtifacts {
    pub fn paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.derived_parquet.as_path()];
        paths.extend(self.derived_csv.as_deref());
        paths.extend(self.resampled_parquet.as_deref());
        paths.push(self.summary_json.as_path());
        paths.push(self.nameplate_json.as_path());
        paths
    }
}

/// Writes run artifacts into one output directory
#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
    write_csv: bool,
}

impl ReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_csv: false,
        }
    }

    /// Also write a CSV copy of the derived sequence
    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every artifact, creating the output directory if needed
    ///
    /// `summary` is written as given; round it beforehand for display.
    pub fn export(
        &self,
        derived: &[DerivedReading],
        resampled: Option<&[ResampledReading]>,
        summary: &SummaryStatistics,
        nameplate: &NameplateTable,
    ) -> Result<ExportedArtifacts> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| PumpError::ExportFailed {
            path: self.output_dir.clone(),
            reason: format!("cannot create output directory: {}", e),
        })?;

        let mut derived_df = derived_frame(derived)?;
        let derived_parquet = self.output_dir.join(DERIVED_PARQUET_FILENAME);
        write_parquet(&mut derived_df, &derived_parquet)?;

        let derived_csv = if self.write_csv {
            let path = self.output_dir.join(DERIVED_CSV_FILENAME);
            write_csv(&mut derived_df, &path)?;
            Some(path)
        } else {
            None
        };

        let resampled_parquet = match resampled {
            Some(rows) => {
                let path = self.output_dir.join(RESAMPLED_PARQUET_FILENAME);
                write_parquet(&mut resampled_frame(rows)?, &path)?;
                Some(path)
            }
            None => None,
        };

        let summary_json = self.output_dir.join(SUMMARY_JSON_FILENAME);
        write_json(summary, &summary_json)?;

        let nameplate_json = self.output_dir.join(NAMEPLATE_JSON_FILENAME);
        write_json(nameplate, &nameplate_json)?;

        let artifacts = ExportedArtifacts {
            derived_parquet,
            derived_csv,
            resampled_parquet,
            summary_json,
            nameplate_json,
        };
        info!(
            "Exported {} artifacts to {}",
            artifacts.paths().len(),
            self.output_dir.display()
        );
        Ok(artifacts)
    }
}

/// Build a DataFrame of the derived sequence
///
/// Columns: `timestamp` (millisecond datetime), every numeric [`Field`], and
/// `power_factor_status`.
pub fn derived_frame(rows: &[DerivedReading]) -> Result<DataFrame> {
    let mut columns = vec![timestamp_column("timestamp", rows)?];
    columns.extend(numeric_columns(rows));
    columns.push(Column::new(
        "power_factor_status".into(),
        rows.iter()
            .map(|r| r.power_factor_status.as_str())
            .collect::<Vec<_>>(),
    ));
    Ok(DataFrame::new(columns)?)
}

/// Build a DataFrame of resampled buckets
pub fn resampled_frame(rows: &[ResampledReading]) -> Result<DataFrame> {
    let mut columns = vec![timestamp_column("bucket_start", rows)?];
    columns.push(Column::new(
        "sample_count".into(),
        rows.iter()
            .map(|r| r.sample_count as u64)
            .collect::<Vec<_>>(),
    ));
    columns.extend(numeric_columns(rows));
    Ok(DataFrame::new(columns)?)
}

fn timestamp_column<R: NumericRow>(name: &str, rows: &[R]) -> Result<Column> {
    let millis: Vec<i64> = rows
        .iter()
        .map(|r| r.timestamp().and_utc().timestamp_millis())
        .collect();
    let column = Column::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(column)
}

fn numeric_columns<R: NumericRow>(rows: &[R]) -> Vec<Column> {
    Field::ALL
        .iter()
        .map(|&field| {
            Column::new(
                field.column_name().into(),
                rows.iter().map(|r| r.value(field)).collect::<Vec<f64>>(),
            )
        })
        .collect()
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .with_statistics(StatisticsOptions::full())
        .finish(df)
        .map_err(|e| PumpError::ExportFailed {
            path: path.to_path_buf(),
            reason: format!("failed to write parquet: {}", e),
        })?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| PumpError::ExportFailed {
            path: path.to_path_buf(),
            reason: format!("failed to write csv: {}", e),
        })?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
