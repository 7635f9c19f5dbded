use crate::job::{BatchJob, BatchJobRecord, JobStatus};
use crate::manifest::{manifest_path, write_batch_manifest, BatchManifest};
use anyhow::{Context, Result};
use gcv_core::ValidationConfig;
use gcv_sigpro::{curve_source, evaluate_sources};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Jobs plus the settings every job shares.
pub struct BatchRunnerConfig {
    pub jobs: Vec<BatchJob>,
    pub output_root: PathBuf,
    pub validation: ValidationConfig,
    /// 0 uses one thread per CPU.
    pub threads: usize,
}

/// Counts and manifest location returned after the run.
pub struct BatchSummary {
    pub success: usize,
    pub failure: usize,
    pub compliant: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<BatchJobRecord>,
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    config
        .validation
        .validate()
        .context("validating batch configuration")?;
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;

    // Jobs share nothing but the read-only configuration.
    let job_records: Vec<BatchJobRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config))
            .collect()
    });

    let manifest = BatchManifest::from_records(job_records);
    let path = manifest_path(&config.output_root);
    write_batch_manifest(&path, &manifest)?;
    let (success, failure, compliant) = (manifest.success, manifest.failure, manifest.compliant);
    info!(success, failure, compliant, threads = thread_count, "batch finished");
    Ok(BatchSummary {
        success,
        failure,
        compliant,
        manifest_path: path,
        jobs: manifest.jobs,
    })
}

/// Score one scenario and write its outcome as JSON. Errors end up in the
/// record, never in the caller.
fn run_job(job: &BatchJob, config: &BatchRunnerConfig) -> BatchJobRecord {
    let output_file = config.output_root.join(&job.job_id).join("report.json");

    let runner = || -> Result<String> {
        let sim = curve_source(job.sim.clone());
        let reference = curve_source(job.reference.clone());
        let outcome = evaluate_sources(
            sim.as_ref(),
            reference.as_ref(),
            &job.request,
            &config.validation,
        )?;
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating job directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&outcome).context("serializing outcome")?;
        fs::write(&output_file, json)
            .with_context(|| format!("writing report '{}'", output_file.display()))?;
        Ok(outcome.label().to_string())
    };
    let (status, outcome, error) = match runner() {
        Ok(label) => (JobStatus::Ok, Some(label), None),
        Err(err) => {
            warn!(job = %job.job_id, error = %format!("{err:#}"), "batch job failed");
            (JobStatus::Error, None, Some(format!("{err:#}")))
        }
    };
    BatchJobRecord {
        job_id: job.job_id.clone(),
        scenario_id: job.scenario_id.clone(),
        status,
        outcome,
        error,
        output: output_file.display().to_string(),
    }
}
