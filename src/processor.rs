//! Main processing engine.
//!
//! Orchestrates a pump extract run: configuration validation, ingestion and
//! cleaning, electrical derivation, scope selection, optional resampling,
//! summary statistics and artifact export.

use crate::analysis::{
    DerivationOptions, DerivationOutput, DerivationStats, MeanPowerFactorEstimate,
    ResampledReading, SummaryStatistics, derive, operating_count, resample, select_scope,
    summarize,
};
use crate::cleaner::{CleanedDataset, CleaningStats, clean_file};
use crate::config::{PipelineConfig, ProcessingMode, VoltagePolicy};
use crate::constants::DEFAULT_OUTPUT_DIR_NAME;
use crate::error::{PumpError, Result};
use crate::export::{ExportedArtifacts, ReportExporter};
use crate::models::DerivedReading;
use crate::nameplate::NameplateTable;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// In-memory result of the analysis stages, before export
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaning: CleaningStats,
    pub derivation: DerivationOutput,
    /// Readings meeting the operating thresholds, when any are configured
    pub operating_records: Option<usize>,
    /// Derived readings the statistics were computed over
    pub in_scope: Vec<DerivedReading>,
    pub resampled: Option<Vec<ResampledReading>>,
    /// Full-precision statistics
    pub summary: SummaryStatistics,
}

/// Run the analysis stages over an already cleaned dataset
///
/// Fails with an empty-dataset error when cleaning left no rows or the
/// aggregation scope selects none.
pub fn run_pipeline(cleaned: CleanedDataset, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    if cleaned.is_empty() {
        return Err(PumpError::empty_dataset(format!(
            "no usable rows after cleaning ({})",
            cleaned.stats.summary()
        )));
    }

    let derivation = derive(&cleaned.readings, &DerivationOptions::from_config(config))?;

    let operating_records = config
        .operating
        .is_configured()
        .then(|| operating_count(&derivation.readings, &config.operating));

    let in_scope = select_scope(&derivation.readings, config.scope, &config.operating)?;
    if in_scope.is_empty() {
        return Err(PumpError::empty_dataset(format!(
            "aggregation scope '{}' selected none of {} derived records",
            config.scope,
            derivation.readings.len()
        )));
    }

    let resampled = config
        .resample
        .as_ref()
        .map(|resample_config| resample(&in_scope, resample_config))
        .transpose()?;

    let summary = match &resampled {
        Some(rows) => summarize(rows.as_slice())?,
        None => summarize(in_scope.as_slice())?,
    }
    .with_scope(config.scope, config.resample.map(|r| r.interval));

    debug!(
        "Summarized {} rows over scope '{}'",
        summary.sample_count, config.scope
    );

    Ok(PipelineOutput {
        cleaning: cleaned.stats,
        derivation,
        operating_records,
        in_scope,
        resampled,
        summary,
    })
}

/// Outcome of a complete processing run
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub cleaning: CleaningStats,
    pub mode: ProcessingMode,
    pub voltage_policy: VoltagePolicy,
    pub mean_power_factor: Option<MeanPowerFactorEstimate>,
    pub derivation: DerivationStats,
    pub operating_records: Option<usize>,
    pub records_in_scope: usize,
    pub resampled_rows: Option<usize>,
    /// Statistics rounded to the configured display precision
    pub summary: SummaryStatistics,
    pub artifacts: ExportedArtifacts,
    pub processing_time_ms: u128,
}

impl ProcessingReport {
    /// One-line description for logs
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} rows read, {} usable, {} dropped; mode {}, voltage {}; {} records in scope",
            self.cleaning.rows_read,
            self.cleaning.usable,
            self.cleaning.dropped,
            self.mode,
            self.voltage_policy,
            self.records_in_scope
        );
        if let Some(estimate) = &self.mean_power_factor {
            line.push_str(&format!("; mean power factor {:.4}", estimate.applied));
        }
        if let Some(rows) = self.resampled_rows {
            line.push_str(&format!("; {} resampled rows", rows));
        }
        line
    }
}

/// Processor for a single pump extract
#[derive(Debug, Clone)]
pub struct PumpProcessor {
    input_path: PathBuf,
    output_dir: PathBuf,
    config: PipelineConfig,
    write_csv: bool,
}

impl PumpProcessor {
    /// Create a processor; the output directory defaults to a folder beside
    /// the input file
    pub fn new(input_path: PathBuf, output_dir: Option<PathBuf>) -> Result<Self> {
        if !input_path.exists() {
            return Err(PumpError::InputNotFound { path: input_path });
        }

        let output_dir = output_dir.unwrap_or_else(|| default_output_dir(&input_path));

        Ok(Self {
            input_path,
            output_dir,
            config: PipelineConfig::default(),
            write_csv: false,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Also export the derived sequence as CSV
    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Clean and analyze the input without writing anything
    pub fn analyze(&self) -> Result<PipelineOutput> {
        self.config.validate()?;
        let cleaned = clean_file(
            &self.input_path,
            &self.config.schema,
            self.config.delimiter_byte()?,
        )?;
        run_pipeline(cleaned, &self.config)
    }

    /// Main processing entry point
    pub fn process(&self) -> Result<ProcessingReport> {
        let start_time = Instant::now();
        info!(
            "Processing {} (mode: {}, voltage policy: {})",
            self.input_path.display(),
            self.config.mode,
            self.config.voltage_policy
        );

        let output = self.analyze()?;

        let summary = output.summary.rounded(self.config.display_precision);
        let nameplate = NameplateTable::new(&self.config.nameplate, &self.config.datasheet);
        let artifacts = ReportExporter::new(&self.output_dir)
            .with_csv(self.write_csv)
            .export(
                &output.derivation.readings,
                output.resampled.as_deref(),
                &summary,
                &nameplate,
            )?;

        let report = ProcessingReport {
            input_path: self.input_path.clone(),
            output_dir: self.output_dir.clone(),
            cleaning: output.cleaning,
            mode: self.config.mode,
            voltage_policy: self.config.voltage_policy,
            mean_power_factor: output.derivation.mean_power_factor,
            derivation: output.derivation.stats,
            operating_records: output.operating_records,
            records_in_scope: output.in_scope.len(),
            resampled_rows: output.resampled.as_ref().map(Vec::len),
            summary,
            artifacts,
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        info!("Run complete: {}", report.summary());
        Ok(report)
    }
}

/// `<input dir>/pump_report`
pub fn default_output_dir(input_path: &Path) -> PathBuf {
    input_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_OUTPUT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::config::{AggregationScope, FillPolicy, OperatingThresholds, ResampleInterval};
    use crate::models::{Field, RawReading};

    /// Two days of readings: a running pump in the morning, idle at night
    fn raw_rows() -> Vec<RawReading> {
        let mut rows = Vec::new();
        let mut line = 2;
        for day in 1..=2 {
            for hour in 0..24 {
                let running = (6..18).contains(&hour);
                let (current, power) = if running { ("22,5", "13,1") } else { ("0", "0") };
                rows.push(RawReading::new(
                    line,
                    format!("{:02}/02/2024 {:02}:00", day, hour),
                    "440",
                    current,
                    power,
                ));
                line += 1;
            }
        }
        rows
    }

    fn operating_config() -> PipelineConfig {
        PipelineConfig::default().with_operating_thresholds(OperatingThresholds {
            min_active_power_kw: Some(1.0),
            min_voltage_v: None,
        })
    }

    #[test]
    fn test_pipeline_all_scope() {
        let output = run_pipeline(clean(&raw_rows()), &PipelineConfig::default()).unwrap();

        assert_eq!(output.cleaning.usable, 48);
        assert_eq!(output.in_scope.len(), 48);
        assert_eq!(output.summary.sample_count, 48);
        assert_eq!(output.derivation.stats.degenerate_apparent_power, 24);
        assert!(output.operating_records.is_none());
        assert!(output.resampled.is_none());
    }

    #[test]
    fn test_operating_scope_differs_from_full_scope() {
        let all = run_pipeline(clean(&raw_rows()), &operating_config()).unwrap();
        let operating = run_pipeline(
            clean(&raw_rows()),
            &operating_config().with_scope(AggregationScope::OperatingOnly),
        )
        .unwrap();

        assert_eq!(all.operating_records, Some(24));
        assert_eq!(operating.in_scope.len(), 24);
        assert_eq!(operating.summary.scope, AggregationScope::OperatingOnly);

        let all_pf = all.summary.get(Field::PowerFactor).unwrap().mean;
        let operating_pf = operating.summary.get(Field::PowerFactor).unwrap().mean;
        assert!(operating_pf > all_pf);
        assert!(operating.summary.get(Field::PowerFactor).unwrap().min > 0.0);
    }

    #[test]
    fn test_daily_resampling_feeds_summary() {
        let config =
            PipelineConfig::default().with_resample(ResampleInterval::Daily, FillPolicy::Skip);
        let output = run_pipeline(clean(&raw_rows()), &config).unwrap();

        let rows = output.resampled.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.sample_count == 24));
        assert_eq!(output.summary.sample_count, 2);
        assert_eq!(output.summary.resample, Some(ResampleInterval::Daily));
    }

    #[test]
    fn test_empty_dataset_after_cleaning() {
        let rows = vec![RawReading::new(2, "garbage", "440", "1", "1")];
        let err = run_pipeline(clean(&rows), &PipelineConfig::default()).unwrap_err();
        assert!(err.is_empty_dataset());
    }

    #[test]
    fn test_empty_operating_scope() {
        let config = PipelineConfig::default()
            .with_operating_thresholds(OperatingThresholds {
                min_active_power_kw: Some(1_000.0),
                min_voltage_v: None,
            })
            .with_scope(AggregationScope::OperatingOnly);
        let err = run_pipeline(clean(&raw_rows()), &config).unwrap_err();
        assert!(err.is_empty_dataset());
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = PipelineConfig::default().with_scope(AggregationScope::OperatingOnly);
        let err = run_pipeline(clean(&raw_rows()), &config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_input_file() {
        let err = PumpProcessor::new(PathBuf::from("/nonexistent/bomba.csv"), None).unwrap_err();
        assert!(matches!(err, PumpError::InputNotFound { .. }));
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/data/plant/bomba.csv")),
            PathBuf::from("/data/plant/pump_report")
        );
    }
}
