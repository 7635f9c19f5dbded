use anyhow::{Context, Result};
use gcv_sigpro::{ComparisonRequest, CurveSourceSpec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// One scenario to score: where both curve sets come from and how to compare them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_id: String,
    pub scenario_id: String,
    pub sim: CurveSourceSpec,
    pub reference: CurveSourceSpec,
    #[serde(default)]
    pub request: ComparisonRequest,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJobRecord {
    pub job_id: String,
    pub scenario_id: String,
    pub status: JobStatus,
    /// Scenario outcome label (`compliant`, `invalid_test`, ...) for jobs that ran.
    pub outcome: Option<String>,
    pub error: Option<String>,
    pub output: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JobFile {
    List(Vec<BatchJob>),
    Wrapped { jobs: Vec<BatchJob> },
}

/// Read jobs from a JSON file holding either a list or `{"jobs": [...]}`.
pub fn load_jobs(path: &Path) -> Result<Vec<BatchJob>> {
    let file =
        File::open(path).with_context(|| format!("opening job file '{}'", path.display()))?;
    let parsed: JobFile = serde_json::from_reader(file)
        .with_context(|| format!("parsing job file '{}'", path.display()))?;
    let jobs = match parsed {
        JobFile::List(jobs) | JobFile::Wrapped { jobs } => jobs,
    };
    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = jobs.iter().find(|job| !seen.insert(job.job_id.as_str())) {
        anyhow::bail!("duplicate job id '{}' in '{}'", dup.job_id, path.display());
    }
    Ok(jobs)
}
