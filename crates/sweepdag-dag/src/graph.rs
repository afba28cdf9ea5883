//! Graph assembly: leaf analysis jobs wired to one aggregation job.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sweepdag_core::errors::{ErrorInfo, SweepError};
use tracing::debug;

use crate::compile::{JobDescriptor, JobKind};
use crate::config::JobConfiguration;

/// Two-layer job graph ready for a submission backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobGraph {
    name: String,
    submit_dir: PathBuf,
    leaf_jobs: Vec<JobDescriptor>,
    aggregation_job: JobDescriptor,
    results_pages: BTreeMap<String, String>,
}

impl JobGraph {
    /// Graph name, `main_<label>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn submit_dir(&self) -> &Path {
        &self.submit_dir
    }

    /// Analysis jobs in expansion order.
    pub fn leaf_jobs(&self) -> &[JobDescriptor] {
        &self.leaf_jobs
    }

    pub fn aggregation_job(&self) -> &JobDescriptor {
        &self.aggregation_job
    }

    /// Expected results page per leaf job name.
    pub fn results_pages(&self) -> &BTreeMap<String, String> {
        &self.results_pages
    }

    /// Every job, leaves first and the aggregation job last.
    pub fn jobs(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.leaf_jobs.iter().chain(std::iter::once(&self.aggregation_job))
    }
}

/// Builds the graph from compiled leaf jobs.
///
/// The aggregation job depends on every leaf and is handed the predicted
/// result path of each one. Fails on an empty leaf list, a repeated job name or
/// a leaf that is not an analysis job.
pub fn assemble(
    config: &JobConfiguration,
    leaf_jobs: Vec<JobDescriptor>,
) -> Result<JobGraph, SweepError> {
    if leaf_jobs.is_empty() {
        return Err(SweepError::internal(
            "assemble.no_leaves",
            "cannot assemble a graph without analysis jobs",
        ));
    }

    let aggregation_name = format!("{}_combine_results", config.label());
    let mut names = BTreeSet::new();
    let mut result_paths = Vec::with_capacity(leaf_jobs.len());
    let mut labels = Vec::with_capacity(leaf_jobs.len());
    let mut results_pages = BTreeMap::new();
    for job in &leaf_jobs {
        let JobKind::Analysis { detectors, .. } = job.kind() else {
            return Err(SweepError::Internal(
                ErrorInfo::new("assemble.non_analysis_leaf", "leaf job is not an analysis job")
                    .with_context("job", job.name()),
            ));
        };
        if job.name() == aggregation_name || !names.insert(job.name().to_string()) {
            return Err(SweepError::Internal(
                ErrorInfo::new("assemble.duplicate_name", "job names must be unique")
                    .with_context("job", job.name()),
            ));
        }
        result_paths.push(config.result_path(job.name()).display().to_string());
        labels.push(detectors.joined());
        results_pages.insert(job.name().to_string(), format!("{}.html", job.name()));
    }

    let mut arguments = vec!["-r".to_string()];
    arguments.extend(result_paths);
    arguments.push("-f".to_string());
    arguments.push(
        config
            .run_directory()
            .join(format!("{aggregation_name}_corner.png"))
            .display()
            .to_string(),
    );
    arguments.push("-l".to_string());
    arguments.extend(labels);

    let aggregation_job = JobDescriptor::aggregation(config, aggregation_name, arguments, names);
    debug!(
        leaves = leaf_jobs.len(),
        aggregation = aggregation_job.name(),
        "assembled job graph"
    );
    Ok(JobGraph {
        name: format!("main_{}", config.label()),
        submit_dir: config.submit_directory(),
        leaf_jobs,
        aggregation_job,
        results_pages,
    })
}
