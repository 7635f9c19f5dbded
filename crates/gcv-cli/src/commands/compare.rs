use anyhow::{Context, Result};
use gcv_core::Signal;
use gcv_sigpro::{evaluate_sources, ComparisonRequest, CsvCurves, EventMetadata};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

use super::{emit, load_config};

pub struct CompareArgs<'a> {
    pub sim: &'a Path,
    pub reference: &'a Path,
    pub t_fault: f64,
    pub duration: f64,
    pub setpoint_tracking: bool,
    pub field: bool,
    pub signals: Option<&'a str>,
    pub config: Option<&'a Path>,
    pub out: Option<&'a Path>,
    pub metrics_csv: Option<&'a Path>,
}

fn parse_signals(spec: Option<&str>) -> Result<Vec<Signal>> {
    spec.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Signal>().map_err(anyhow::Error::from))
        .collect()
}

pub fn handle(args: &CompareArgs<'_>) -> Result<()> {
    let config = load_config(args.config)?;
    let event = EventMetadata {
        t_fault: args.t_fault,
        fault_duration: args.duration,
        fs_hz: None,
    };
    let sim = CsvCurves::new(args.sim, event);
    let reference = CsvCurves::new(args.reference, event).field_measurement(args.field);
    let request = ComparisonRequest {
        signals: parse_signals(args.signals)?,
        setpoint_tracking: args.setpoint_tracking,
        ..ComparisonRequest::default()
    };

    let outcome = evaluate_sources(&sim, &reference, &request, &config)
        .with_context(|| format!("comparing '{}'", args.sim.display()))?;
    info!("Scenario outcome: {}", outcome.label());

    if let Some(path) = args.metrics_csv {
        match outcome.report() {
            Some(report) => {
                let file = File::create(path)
                    .with_context(|| format!("creating '{}'", path.display()))?;
                report.metrics.write_csv(file)?;
                info!("Metrics written to {}", path.display());
            }
            None => warn!("No metrics to write for a {} outcome", outcome.label()),
        }
    }

    let json = serde_json::to_string_pretty(&outcome).context("serializing report")?;
    emit(&json, args.out)
}
