//! Translation of one [`JobSpecification`] into a scheduler job descriptor.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sweepdag_core::errors::{ErrorInfo, SweepError};
use sweepdag_core::seed::derive_named_seed;
use tracing::debug;

use crate::config::{JobConfiguration, ResourceRequests, SchedulerOptions};
use crate::detectors::DetectorSet;
use crate::expand::JobSpecification;

/// What a descriptor runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// One detector subset sampled with one sampler.
    Analysis {
        detectors: DetectorSet,
        sampler: String,
    },
    /// Combines the results of every analysis job.
    Aggregation,
}

/// Everything the submission backend needs to render one scheduler job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    name: String,
    kind: JobKind,
    executable: PathBuf,
    arguments: Vec<String>,
    log_dir: PathBuf,
    output_dir: PathBuf,
    submit_dir: PathBuf,
    resources: ResourceRequests,
    scheduler: SchedulerOptions,
    queue: u32,
    extra_directives: Vec<String>,
    parents: BTreeSet<String>,
}

impl JobDescriptor {
    pub(crate) fn aggregation(
        config: &JobConfiguration,
        name: String,
        arguments: Vec<String>,
        parents: BTreeSet<String>,
    ) -> Self {
        Self {
            name,
            kind: JobKind::Aggregation,
            executable: config.aggregation_executable().to_path_buf(),
            arguments,
            log_dir: config.log_directory(),
            output_dir: config.log_directory(),
            submit_dir: config.submit_directory(),
            resources: ResourceRequests::default(),
            scheduler: SchedulerOptions {
                requirements: None,
                retry: None,
                ..config.scheduler().clone()
            },
            queue: 1,
            extra_directives: vec![accounting_directive(config)],
            parents,
        }
    }

    /// Unique name, also used for the submit file and result path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments in the order they are passed to the executable.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Directory receiving the job's stdout and stderr captures.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn submit_dir(&self) -> &Path {
        &self.submit_dir
    }

    pub fn resources(&self) -> &ResourceRequests {
        &self.resources
    }

    pub fn scheduler(&self) -> &SchedulerOptions {
        &self.scheduler
    }

    pub fn queue(&self) -> u32 {
        self.queue
    }

    /// Retry budget for the DAG node, if any.
    pub fn retry(&self) -> Option<u32> {
        self.scheduler.retry
    }

    /// Raw `key = value` lines appended to the submit description.
    pub fn extra_directives(&self) -> &[String] {
        &self.extra_directives
    }

    /// Names of jobs that must finish before this one starts.
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }
}

/// Name of the analysis job for `spec`: `<label>_<detectors>_<sampler>`.
pub fn job_name(config: &JobConfiguration, spec: &JobSpecification) -> String {
    format!(
        "{}_{}_{}",
        config.label(),
        spec.detector_subset().joined(),
        spec.sampler()
    )
}

/// Compiles one analysis job.
///
/// Creates the log and submit directories under the run directory. A
/// specification that does not come from [`crate::expand::expand`] over the
/// same configuration is rejected as an internal error.
pub fn compile(
    config: &JobConfiguration,
    spec: &JobSpecification,
) -> Result<JobDescriptor, SweepError> {
    let subset = spec.detector_subset();
    if subset.is_empty() {
        return Err(SweepError::internal(
            "compile.empty_subset",
            "job specification has an empty detector subset",
        ));
    }
    if !subset.is_subset(config.detectors()) {
        return Err(SweepError::Internal(
            ErrorInfo::new(
                "compile.foreign_subset",
                "job detector subset is not part of the configured detectors",
            )
            .with_context("subset", subset.to_string())
            .with_context("detectors", config.detectors().to_string()),
        ));
    }
    if !config.samplers().iter().any(|s| s == spec.sampler()) {
        return Err(SweepError::Internal(
            ErrorInfo::new("compile.foreign_sampler", "job sampler is not configured")
                .with_context("sampler", spec.sampler()),
        ));
    }

    let log_dir = config.log_directory();
    let submit_dir = config.submit_directory();
    for dir in [&log_dir, &submit_dir] {
        fs::create_dir_all(dir).map_err(|err| SweepError::io("compile.mkdir", dir, err))?;
    }

    let name = job_name(config, spec);
    let mut arguments = vec!["--ini".to_string(), config.ini().display().to_string()];
    for id in subset.iter() {
        arguments.push("--detectors".to_string());
        arguments.push(id.to_string());
    }
    arguments.extend([
        "--sampler".to_string(),
        spec.sampler().to_string(),
        "--cluster".to_string(),
        "$(Cluster)".to_string(),
        "--process".to_string(),
        "$(Process)".to_string(),
    ]);
    if let Some(master) = config.sampling_seed() {
        arguments.push("--sampling-seed".to_string());
        arguments.push(derive_named_seed(master, &name).to_string());
    }
    arguments.extend(config.passthrough().iter().cloned());

    let mut extra_directives = vec![accounting_directive(config)];
    if let Some(credential) = config.credential_path() {
        extra_directives.push(format!("x509userproxy = {}", credential.display()));
    }

    debug!(job = %name, arguments = arguments.len(), "compiled analysis job");
    Ok(JobDescriptor {
        name,
        kind: JobKind::Analysis {
            detectors: subset.clone(),
            sampler: spec.sampler().to_string(),
        },
        executable: config.executable().to_path_buf(),
        arguments,
        output_dir: log_dir.clone(),
        log_dir,
        submit_dir,
        resources: config.resources().clone(),
        scheduler: config.scheduler().clone(),
        queue: config.queue(),
        extra_directives,
        parents: BTreeSet::new(),
    })
}

fn accounting_directive(config: &JobConfiguration) -> String {
    format!("accounting_group = {}", config.accounting_tag())
}
