//! Submission backends: turn a [`JobGraph`] into scheduler artifacts and hand
//! them to the scheduler.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sweepdag_core::errors::SweepError;

use crate::graph::JobGraph;

pub mod condor;

pub use condor::CondorBackend;

/// Artifacts written by [`SubmissionBackend::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedGraph {
    /// Top-level graph file handed to the scheduler.
    pub graph_file: PathBuf,
    /// One submit description per job, leaves first.
    pub submit_files: Vec<PathBuf>,
    /// Canonical JSON manifest of the graph.
    pub manifest: PathBuf,
    /// SHA-256 of the canonical graph description.
    pub graph_hash: String,
}

impl RenderedGraph {
    pub fn graph_file(&self) -> &Path {
        &self.graph_file
    }
}

/// What the scheduler reported after accepting a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Cluster identifiers assigned by the scheduler.
    pub cluster_ids: Vec<u64>,
    /// Raw scheduler output.
    pub stdout: String,
}

/// A batch scheduler the graph can be rendered for and submitted to.
pub trait SubmissionBackend: Send + Sync {
    /// Writes every artifact needed to run `graph`.
    fn render(&self, graph: &JobGraph) -> Result<RenderedGraph, SweepError>;

    /// Submits previously rendered artifacts. Called at most once per render;
    /// a failure is reported as is, no retry.
    fn submit(&self, rendered: &RenderedGraph) -> Result<SubmissionReceipt, SweepError>;
}
