#![doc = "Sweep configuration, job-set expansion, job compilation and HTCondor DAG assembly."]

/// Submission backends and the HTCondor renderer.
pub mod backend;
/// Specification to job descriptor compilation.
pub mod compile;
/// Raw configuration loading and validation.
pub mod config;
/// Detector identifier normalisation.
pub mod detectors;
/// Job-set expansion.
pub mod expand;
/// Leaf/aggregation graph assembly.
pub mod graph;
/// Canonical hashing helpers.
pub mod hash;
/// Parallel build and generate entry points.
pub mod pipeline;
/// Canonical JSON and YAML serde helpers.
pub mod serde;

pub use backend::{CondorBackend, RenderedGraph, SubmissionBackend, SubmissionReceipt};
pub use compile::{compile, job_name, JobDescriptor, JobKind};
pub use config::{JobConfiguration, RawConfig, Resolver};
pub use detectors::DetectorSet;
pub use expand::{expand, JobSpecification};
pub use graph::{assemble, JobGraph};
pub use pipeline::{build_graph, generate, BuildOpts, GenerateReport};
