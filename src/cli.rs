use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use crate::config::ReportConfig;
use crate::report::build_report;
use crate::snapshot::WindowSnapshot;

#[derive(Parser)]
#[command(name = "trendlens")]
#[command(author, version, about = "CI pass-rate trend comparison tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a current window snapshot against a previous one
    Compare {
        /// Snapshot of the current window (JSON)
        #[arg(short, long)]
        current: PathBuf,

        /// Snapshot of the previous window (JSON)
        #[arg(short = 'P', long)]
        previous: PathBuf,

        /// Report configuration file (JSON)
        #[arg(long, env = "TRENDLENS_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ConfigOverrides {
    /// Current-window run count above which the high-confidence threshold applies
    #[arg(long, env = "TRENDLENS_MIN_RUNS_FOR_HIGH_CONFIDENCE")]
    min_runs_for_high_confidence: Option<u64>,

    /// Pass-rate change in points needed to flag a trend with many runs
    #[arg(long, env = "TRENDLENS_HIGH_CONFIDENCE_THRESHOLD")]
    high_confidence_threshold: Option<f64>,

    /// Pass-rate change in points needed to flag a trend with few runs
    #[arg(long, env = "TRENDLENS_LOW_CONFIDENCE_THRESHOLD")]
    low_confidence_threshold: Option<f64>,

    /// Maximum number of canary tests to report
    #[arg(long, env = "TRENDLENS_CANARY_LIMIT")]
    canary_limit: Option<usize>,

    /// Maximum number of rows in each top failing test list
    #[arg(long, env = "TRENDLENS_TOP_FAILING_LIMIT")]
    top_failing_limit: Option<usize>,
}

impl ConfigOverrides {
    fn apply(&self, mut config: ReportConfig) -> ReportConfig {
        if let Some(runs) = self.min_runs_for_high_confidence {
            config.significance.min_runs_for_high_confidence = runs;
        }
        if let Some(threshold) = self.high_confidence_threshold {
            config.significance.high_confidence_threshold = threshold;
        }
        if let Some(threshold) = self.low_confidence_threshold {
            config.significance.low_confidence_threshold = threshold;
        }
        if let Some(limit) = self.canary_limit {
            config.canary_limit = limit;
        }
        if let Some(limit) = self.top_failing_limit {
            config.top_failing_limit = limit;
        }
        config
    }
}

fn resolve_config(
    path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> crate::error::Result<ReportConfig> {
    let base = match path {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    let config = overrides.apply(base);
    config.validate()?;

    debug!("Significance thresholds in effect: {:?}", config.significance);
    debug!("Test health bands in effect: {:?}", config.bands.tests.bands());
    Ok(config)
}

impl Cli {
    pub fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Compare {
                current,
                previous,
                config,
                overrides,
            } => {
                info!(
                    "Comparing {} against {}",
                    current.display(),
                    previous.display()
                );

                let config = resolve_config(config.as_deref(), overrides)?;
                let current = WindowSnapshot::load(current, "current")?;
                let previous = WindowSnapshot::load(previous, "previous")?;

                let report = build_report(&current, &previous, &config)?;

                // Serialize to JSON
                let json_output = if self.pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                };

                // Write to output
                if let Some(output_path) = &self.output {
                    std::fs::write(output_path, json_output)?;
                    info!("Report written to: {}", output_path.display());
                } else {
                    println!("{json_output}");
                }

                Ok(())
            }
        }
    }
}
