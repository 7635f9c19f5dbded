use anyhow::Result;
use gcv_batch::{load_jobs, run_batch, BatchRunnerConfig, BatchSummary, JobStatus};
use std::path::Path;

use super::load_config;

fn print_batch_summary(summary: &BatchSummary) {
    println!(
        "Jobs: {} total, {} ok, {} failed, {} compliant",
        summary.jobs.len(),
        summary.success,
        summary.failure,
        summary.compliant
    );
    for record in summary.jobs.iter().filter(|r| r.status == JobStatus::Error) {
        println!(
            "  {} failed: {}",
            record.job_id,
            record.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("Manifest: {}", summary.manifest_path.display());
}

pub fn handle(jobs: &Path, out: &Path, threads: usize, config: Option<&Path>) -> Result<()> {
    let validation = load_config(config)?;
    let jobs = load_jobs(jobs)?;
    let summary = run_batch(&BatchRunnerConfig {
        jobs,
        output_root: out.to_path_buf(),
        validation,
        threads,
    })?;
    print_batch_summary(&summary);
    Ok(())
}
