pub mod generate;
pub mod plan;

use std::path::PathBuf;

use clap::Args;
use sweepdag_core::errors::SweepError;
use sweepdag_dag::config::{JobConfiguration, ListInput, RawConfig, Resolver};
use sweepdag_dag::BuildOpts;

/// Configuration file plus flag overrides shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML configuration file. Also handed to every analysis job as `--ini`.
    pub config: PathBuf,
    /// Detectors to include, e.g. `H1 L1` (overrides the file).
    #[arg(long, alias = "include-detectors", num_args = 1..)]
    pub detectors: Vec<String>,
    /// Sampler or samplers to run.
    #[arg(long, num_args = 1..)]
    pub sampler: Vec<String>,
    /// Add one job per individual detector.
    #[arg(long)]
    pub coherence_test: bool,
    /// Scheduler accounting group.
    #[arg(long)]
    pub accounting: Option<String>,
    /// Path to the analysis executable or its name in the library.
    #[arg(long)]
    pub executable: Option<String>,
    /// X509 proxy file. Defaults to a copy of `$X509_USER_PROXY`.
    #[arg(long = "X509", alias = "x509")]
    pub x509: Option<PathBuf>,
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long)]
    pub outdir: Option<PathBuf>,
    /// Processes queued per analysis job.
    #[arg(long)]
    pub queue: Option<u32>,
    #[arg(long)]
    pub request_memory: Option<String>,
    #[arg(long)]
    pub request_disk: Option<String>,
    #[arg(long)]
    pub request_cpus: Option<u32>,
    #[arg(long)]
    pub universe: Option<String>,
    /// Pass the submitting environment to jobs (`true` or `false`).
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub getenv: Option<bool>,
    #[arg(long)]
    pub notification: Option<String>,
    #[arg(long)]
    pub requirements: Option<String>,
    /// DAGMan retry count per job.
    #[arg(long)]
    pub retry: Option<u32>,
    /// Program run by the aggregation job.
    #[arg(long)]
    pub aggregation_executable: Option<String>,
    /// Master seed; each analysis job receives a seed derived from its name.
    #[arg(long)]
    pub sampling_seed: Option<u64>,
    /// Additional detector identifiers to accept.
    #[arg(long, num_args = 1..)]
    pub extra_detectors: Vec<String>,
    /// Number of jobs compiled in parallel.
    #[arg(long)]
    pub jobs: Option<usize>,
    /// Arguments after `--`, appended verbatim to every analysis job.
    #[arg(last = true)]
    pub passthrough: Vec<String>,
}

fn list(values: &[String]) -> Option<ListInput> {
    (!values.is_empty()).then(|| ListInput::Many(values.to_vec()))
}

impl ConfigArgs {
    /// Flag values as a raw layer for [`RawConfig::overlay`].
    pub fn overrides(&self) -> RawConfig {
        RawConfig {
            detectors: list(&self.detectors),
            sampler: list(&self.sampler),
            coherence_test: self.coherence_test.then_some(true),
            accounting: self.accounting.clone(),
            executable: self.executable.clone(),
            x509: self.x509.clone(),
            label: self.label.clone(),
            outdir: self.outdir.clone(),
            queue: self.queue,
            request_memory: self.request_memory.clone(),
            request_disk: self.request_disk.clone(),
            request_cpus: self.request_cpus,
            universe: self.universe.clone(),
            getenv: self.getenv,
            notification: self.notification.clone(),
            requirements: self.requirements.clone(),
            retry: self.retry,
            aggregation_executable: self.aggregation_executable.clone(),
            sampling_seed: self.sampling_seed,
            extra_detectors: list(&self.extra_detectors),
            passthrough: self.passthrough.clone(),
            ..RawConfig::default()
        }
    }

    pub fn load(&self, overrides: RawConfig) -> Result<JobConfiguration, SweepError> {
        let raw = RawConfig::load(&self.config)?.overlay(overrides);
        JobConfiguration::from_raw(&self.config, raw, &Resolver::from_env())
    }

    pub fn build_opts(&self) -> BuildOpts {
        match self.jobs {
            Some(concurrency) => BuildOpts { concurrency },
            None => BuildOpts::default(),
        }
    }
}
