//! End-to-end generation: expand, compile, assemble, render and optionally
//! submit.

use rayon::prelude::*;
use serde::Serialize;
use sweepdag_core::errors::{ErrorInfo, SweepError};
use tracing::info;

use crate::backend::{RenderedGraph, SubmissionBackend, SubmissionReceipt};
use crate::compile::{compile, JobDescriptor};
use crate::config::JobConfiguration;
use crate::expand::expand;
use crate::graph::{assemble, JobGraph};

/// Options governing graph construction.
#[derive(Debug, Clone)]
pub struct BuildOpts {
    /// Number of specifications compiled in parallel. Output order never
    /// depends on it.
    pub concurrency: usize,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        }
    }
}

/// Outcome of [`generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    pub rendered: RenderedGraph,
    /// Present only when the configuration asked for submission.
    pub receipt: Option<SubmissionReceipt>,
}

/// Expands `config` and compiles every specification into a graph.
pub fn build_graph(config: &JobConfiguration, opts: &BuildOpts) -> Result<JobGraph, SweepError> {
    let specs = expand(config);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .build()
        .map_err(|err| SweepError::Internal(ErrorInfo::new("thread_pool", err.to_string())))?;
    let leaves: Vec<JobDescriptor> = pool.install(|| {
        specs
            .par_iter()
            .map(|spec| compile(config, spec))
            .collect::<Result<Vec<_>, SweepError>>()
    })?;
    assemble(config, leaves)
}

/// Builds the graph, renders it with `backend` and submits it when the
/// configuration requests submission.
pub fn generate(
    config: &JobConfiguration,
    backend: &dyn SubmissionBackend,
    opts: &BuildOpts,
) -> Result<GenerateReport, SweepError> {
    let graph = build_graph(config, opts)?;
    let rendered = backend.render(&graph)?;
    let receipt = if config.submit() {
        Some(backend.submit(&rendered)?)
    } else {
        info!(dag = %rendered.graph_file.display(), "submission not requested, graph rendered only");
        None
    };
    Ok(GenerateReport { rendered, receipt })
}
