use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::job::{BatchJobRecord, JobStatus};

/// File name of the manifest inside a batch output root.
pub const MANIFEST_FILE: &str = "batch_manifest.json";

/// Summary of one batch run: per-job records plus the counts derived from them.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    /// Jobs that ran and were scored compliant.
    pub compliant: usize,
    /// Number of jobs per scenario outcome label.
    #[serde(default)]
    pub outcomes: BTreeMap<String, usize>,
    pub jobs: Vec<BatchJobRecord>,
}

impl BatchManifest {
    pub fn from_records(jobs: Vec<BatchJobRecord>) -> Self {
        let success = jobs.iter().filter(|r| r.status == JobStatus::Ok).count();
        let mut outcomes = BTreeMap::new();
        for label in jobs.iter().filter_map(|r| r.outcome.as_deref()) {
            *outcomes.entry(label.to_string()).or_insert(0) += 1;
        }
        Self {
            created_at: Utc::now(),
            num_jobs: jobs.len(),
            success,
            failure: jobs.len() - success,
            compliant: outcomes.get("compliant").copied().unwrap_or(0),
            outcomes,
            jobs,
        }
    }

    /// Reject a manifest whose counts disagree with its job records.
    pub fn check_counts(&self) -> Result<()> {
        let recount = Self::from_records(self.jobs.clone());
        ensure!(
            self.num_jobs == recount.num_jobs,
            "manifest lists {} jobs but num_jobs is {}",
            recount.num_jobs,
            self.num_jobs
        );
        ensure!(
            self.success == recount.success && self.failure == recount.failure,
            "manifest counts {} ok / {} failed jobs, records say {} / {}",
            self.success,
            self.failure,
            recount.success,
            recount.failure
        );
        ensure!(
            self.compliant == recount.compliant,
            "manifest counts {} compliant scenarios, records say {}",
            self.compliant,
            recount.compliant
        );
        Ok(())
    }

    pub fn record(&self, job_id: &str) -> Option<&BatchJobRecord> {
        self.jobs.iter().find(|r| r.job_id == job_id)
    }
}

pub fn manifest_path(output_root: &Path) -> PathBuf {
    output_root.join(MANIFEST_FILE)
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating batch output root '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest)
        .context("serializing validation batch manifest")?;
    fs::write(path, json)
        .with_context(|| format!("writing validation batch manifest '{}'", path.display()))?;
    Ok(())
}

/// Read a manifest back and check that its counts match its records.
pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening validation batch manifest '{}'", path.display()))?;
    let manifest: BatchManifest = serde_json::from_reader(file)
        .with_context(|| format!("parsing validation batch manifest '{}'", path.display()))?;
    manifest
        .check_counts()
        .with_context(|| format!("inconsistent batch manifest '{}'", path.display()))?;
    Ok(manifest)
}
