//! Command-line interface components.

use crate::config::{
    AggregationScope, FillPolicy, OperatingThresholds, PipelineConfig, ProcessingMode,
    ResampleConfig, ResampleInterval, VoltagePolicy,
};
use crate::error::{PumpError, Result};
use crate::models::Field;
use crate::processor::{ProcessingReport, PumpProcessor};
use anyhow::Context;
use clap::{ArgAction, Parser};
use colored::*;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "pump_processor")]
#[command(about = "Clean pump sensor extracts and derive power factor, reactive power and loading")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Delimited text extract with timestamp, voltage, current and power columns
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output directory for exported artifacts (defaults to <input dir>/pump_report)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Processing mode (direct, mean-ratio)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Voltage source for apparent power (measured, fixed)
    #[arg(long)]
    pub voltage_policy: Option<String>,

    /// Line voltage in volts for the fixed voltage policy; implies `fixed`
    #[arg(long, value_name = "VOLTS")]
    pub line_voltage: Option<f64>,

    /// Field delimiter of the input file
    #[arg(short, long)]
    pub delimiter: Option<char>,

    /// Minimum active power (kW) for a reading to count as operating
    #[arg(long, value_name = "KW")]
    pub min_power: Option<f64>,

    /// Minimum voltage (V) for a reading to count as operating
    #[arg(long, value_name = "VOLTS")]
    pub min_voltage: Option<f64>,

    /// Compute statistics over operating readings only
    #[arg(long)]
    pub operating_only: bool,

    /// Resample before computing statistics (hourly, daily, <n>min)
    #[arg(short, long, value_name = "INTERVAL")]
    pub resample: Option<String>,

    /// Fill empty resample buckets with this value instead of skipping them
    #[arg(long, value_name = "VALUE", requires = "resample")]
    pub fill_value: Option<f64>,

    /// Also write the derived readings as CSV
    #[arg(long)]
    pub csv: bool,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Get the tracing level implied by the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Resolve the run configuration from the config file and flags
    pub fn build_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        apply_cli_overrides(&mut config, self)?;
        config.validate()?;
        Ok(config)
    }
}

/// Apply command-line overrides to a loaded configuration
pub fn apply_cli_overrides(config: &mut PipelineConfig, args: &Args) -> Result<()> {
    if let Some(mode) = &args.mode {
        config.mode = mode.parse::<ProcessingMode>()?;
    }

    match (&args.voltage_policy, args.line_voltage) {
        (Some(selector), line_voltage) => {
            let mut policy = selector.parse::<VoltagePolicy>()?;
            match (&mut policy, line_voltage) {
                (VoltagePolicy::Fixed { line_voltage_v }, Some(volts)) => *line_voltage_v = volts,
                (VoltagePolicy::Fixed { line_voltage_v }, None) => {
                    // Keep a fixed voltage set in the config file
                    if let VoltagePolicy::Fixed {
                        line_voltage_v: configured,
                    } = config.voltage_policy
                    {
                        *line_voltage_v = configured;
                    }
                }
                (VoltagePolicy::Measured, Some(_)) => {
                    return Err(PumpError::configuration(
                        "--line-voltage requires the fixed voltage policy",
                    ));
                }
                (VoltagePolicy::Measured, None) => {}
            }
            config.voltage_policy = policy;
        }
        (None, Some(volts)) => {
            config.voltage_policy = VoltagePolicy::Fixed {
                line_voltage_v: volts,
            };
        }
        (None, None) => {}
    }

    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }

    if args.min_power.is_some() || args.min_voltage.is_some() {
        config.operating = OperatingThresholds {
            min_active_power_kw: args.min_power.or(config.operating.min_active_power_kw),
            min_voltage_v: args.min_voltage.or(config.operating.min_voltage_v),
        };
    }
    if args.operating_only {
        config.scope = AggregationScope::OperatingOnly;
    }

    if let Some(interval) = &args.resample {
        let interval = interval.parse::<ResampleInterval>()?;
        let fill = match args.fill_value {
            Some(value) => FillPolicy::Value(value),
            None => FillPolicy::Skip,
        };
        config.resample = Some(ResampleConfig { interval, fill });
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` takes precedence
pub fn setup_logging(args: &Args) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pump_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Run a full processing pass for the parsed arguments
pub fn run(args: &Args) -> anyhow::Result<ProcessingReport> {
    let config = args.build_config().context("Invalid configuration")?;

    println!("{}", "Starting pump extract processing".bright_green().bold());
    println!("  {} {}", "Input:".bright_cyan(), args.input.display());
    println!("  {} {}", "Mode:".bright_cyan(), config.mode);
    println!("  {} {}", "Voltage policy:".bright_cyan(), config.voltage_policy);

    let processor = PumpProcessor::new(args.input.clone(), args.output_dir.clone())?
        .with_config(config)
        .with_csv(args.csv);
    println!(
        "  {} {}",
        "Output:".bright_cyan(),
        processor.output_dir().display()
    );

    let report = processor
        .process()
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    print_report(&report);
    Ok(report)
}

/// Print the human-facing run summary
pub fn print_report(report: &ProcessingReport) {
    println!("\n{}", "Cleaning".bright_yellow());
    println!(
        "  {} {}",
        "Rows read:".bright_cyan(),
        report.cleaning.rows_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Usable rows:".bright_cyan(),
        report.cleaning.usable.to_string().bright_white().bold()
    );
    if report.cleaning.dropped > 0 {
        println!(
            "  {} {} (timestamp {}, voltage {}, current {}, power {})",
            "Dropped rows:".bright_red(),
            report.cleaning.dropped.to_string().bright_red().bold(),
            report.cleaning.dropped_timestamp,
            report.cleaning.dropped_voltage,
            report.cleaning.dropped_current,
            report.cleaning.dropped_power
        );
    }

    println!("\n{}", "Derivation".bright_yellow());
    println!("  {} {}", "Processing mode:".bright_cyan(), report.mode);
    println!(
        "  {} {}",
        "Voltage policy:".bright_cyan(),
        report.voltage_policy
    );
    if let Some(estimate) = &report.mean_power_factor {
        println!(
            "  {} {:.4} (raw {:.4}, {} records)",
            "Mean power factor:".bright_cyan(),
            estimate.applied,
            estimate.raw_mean,
            estimate.samples
        );
    }
    if report.derivation.degenerate_apparent_power > 0 {
        println!(
            "  {} {}",
            "Zero apparent power:".bright_yellow(),
            report.derivation.degenerate_apparent_power
        );
    }
    if report.derivation.clipped_power_factor > 0 {
        println!(
            "  {} {}",
            "Clipped power factor:".bright_yellow(),
            report.derivation.clipped_power_factor
        );
    }
    if let Some(operating) = report.operating_records {
        println!(
            "  {} {}",
            "Operating records:".bright_cyan(),
            operating.to_string().bright_white()
        );
    }
    println!(
        "  {} {} ({})",
        "Records in scope:".bright_cyan(),
        report.records_in_scope.to_string().bright_white(),
        report.summary.scope
    );
    if let (Some(rows), Some(interval)) = (report.resampled_rows, report.summary.resample) {
        println!(
            "  {} {} {} buckets",
            "Resampled:".bright_cyan(),
            rows.to_string().bright_white(),
            interval
        );
    }

    println!("\n{}", "Summary".bright_green().bold());
    for field in [
        Field::ActivePowerKw,
        Field::ApparentPowerKva,
        Field::PowerFactor,
        Field::ReactivePowerKvar,
        Field::LoadPercent,
    ] {
        if let Some(stats) = report.summary.get(field) {
            println!(
                "  {:<24} mean {} std {} min {} max {}",
                field.label().bright_cyan(),
                stats.mean.to_string().bright_white(),
                stats.std_dev,
                stats.min,
                stats.max
            );
        }
    }

    println!("\n{}", "Artifacts".bright_yellow());
    for path in report.artifacts.paths() {
        println!("  {}", path.display());
    }
    println!(
        "\n  {} {}ms",
        "Time elapsed:".bright_cyan(),
        report.processing_time_ms.to_string().bright_white()
    );
}
