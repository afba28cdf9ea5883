//! HTCondor DAGMan backend.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use sweepdag_core::errors::{ErrorInfo, SweepError};
use tracing::info;

use super::{RenderedGraph, SubmissionBackend, SubmissionReceipt};
use crate::compile::JobDescriptor;
use crate::graph::JobGraph;
use crate::hash::stable_hash_string;
use crate::serde::to_canonical_json_bytes;

/// Program used to submit a DAG when none is configured.
pub const DEFAULT_SUBMIT_PROGRAM: &str = "condor_submit_dag";

const MANIFEST_FILE: &str = "graph.json";

/// Renders submit descriptions and a DAGMan file, submits with
/// `condor_submit_dag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondorBackend {
    submit_program: PathBuf,
}

impl Default for CondorBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMIT_PROGRAM)
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    graph_hash: &'a str,
    graph: &'a JobGraph,
}

impl CondorBackend {
    pub fn new(submit_program: impl Into<PathBuf>) -> Self {
        Self {
            submit_program: submit_program.into(),
        }
    }
}

impl SubmissionBackend for CondorBackend {
    fn render(&self, graph: &JobGraph) -> Result<RenderedGraph, SweepError> {
        let submit_dir = graph.submit_dir();
        fs::create_dir_all(submit_dir)
            .map_err(|err| SweepError::io("backend.mkdir", submit_dir, err))?;

        let mut submit_files = Vec::new();
        for job in graph.jobs() {
            let path = submit_file_path(submit_dir, job);
            write_file(&path, render_submit_file(job).as_bytes())?;
            submit_files.push(path);
        }

        let graph_file = submit_dir.join(format!("{}.dag", graph.name()));
        write_file(&graph_file, render_dag_file(graph).as_bytes())?;

        let graph_hash = stable_hash_string(graph)?;
        let manifest = submit_dir.join(MANIFEST_FILE);
        let bytes = to_canonical_json_bytes(&Manifest {
            graph_hash: &graph_hash,
            graph,
        })?;
        write_file(&manifest, &bytes)?;

        info!(
            dag = %graph_file.display(),
            jobs = submit_files.len(),
            graph_hash = %graph_hash,
            "rendered condor dag"
        );
        Ok(RenderedGraph {
            graph_file,
            submit_files,
            manifest,
            graph_hash,
        })
    }

    fn submit(&self, rendered: &RenderedGraph) -> Result<SubmissionReceipt, SweepError> {
        let mut command = Command::new(&self.submit_program);
        command
            .arg(rendered.graph_file())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = rendered.graph_file().parent() {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|err| {
            SweepError::Backend(
                ErrorInfo::new("backend.spawn", err.to_string())
                    .with_context("program", self.submit_program.display().to_string()),
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(SweepError::Backend(
                ErrorInfo::new("backend.rejected", "scheduler rejected the submission")
                    .with_context("program", self.submit_program.display().to_string())
                    .with_context("status", status)
                    .with_context("stdout", stdout.trim())
                    .with_context("stderr", stderr.trim()),
            ));
        }

        let cluster_ids = parse_cluster_ids(&stdout);
        info!(
            dag = %rendered.graph_file().display(),
            clusters = ?cluster_ids,
            "submitted condor dag"
        );
        Ok(SubmissionReceipt {
            cluster_ids,
            stdout,
        })
    }
}

fn submit_file_path(submit_dir: &Path, job: &JobDescriptor) -> PathBuf {
    submit_dir.join(format!("{}.submit", job.name()))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SweepError> {
    fs::write(path, bytes).map_err(|err| SweepError::io("backend.write", path, err))
}

/// Renders one HTCondor submit description.
pub fn render_submit_file(job: &JobDescriptor) -> String {
    let mut out = String::new();
    let scheduler = job.scheduler();
    let resources = job.resources();
    let mut line = |key: &str, value: &str| {
        let _ = writeln!(out, "{key} = {value}");
    };

    line("universe", &scheduler.universe);
    line("executable", &job.executable().display().to_string());
    if let Some(memory) = &resources.memory {
        line("request_memory", memory);
    }
    if let Some(disk) = &resources.disk {
        line("request_disk", disk);
    }
    if let Some(cpus) = resources.cpus {
        line("request_cpus", &cpus.to_string());
    }
    line("getenv", if scheduler.getenv { "True" } else { "False" });
    line("notification", &scheduler.notification);
    if let Some(requirements) = &scheduler.requirements {
        line("requirements", requirements);
    }
    let stem = format!("{}_$(Cluster)_$(Process)", job.name());
    line("log", &job.log_dir().join(format!("{stem}.log")).display().to_string());
    line("output", &job.output_dir().join(format!("{stem}.out")).display().to_string());
    line("error", &job.output_dir().join(format!("{stem}.err")).display().to_string());
    for directive in job.extra_directives() {
        let _ = writeln!(out, "{directive}");
    }
    let _ = writeln!(out, "arguments = \"{}\"", quote_arguments(job.arguments()));
    let _ = writeln!(out, "queue {}", job.queue());
    out
}

/// Renders the DAGMan description for `graph`.
pub fn render_dag_file(graph: &JobGraph) -> String {
    let mut out = String::new();
    for job in graph.jobs() {
        let _ = writeln!(
            out,
            "JOB {} {}",
            job.name(),
            submit_file_path(graph.submit_dir(), job).display()
        );
        if let Some(retry) = job.retry() {
            let _ = writeln!(out, "RETRY {} {}", job.name(), retry);
        }
    }
    let aggregation = graph.aggregation_job();
    let parents: Vec<&str> = aggregation.parents().iter().map(String::as_str).collect();
    let _ = writeln!(
        out,
        "PARENT {} CHILD {}",
        parents.join(" "),
        aggregation.name()
    );
    out
}

/// Quotes an argument vector using the HTCondor "new" arguments syntax.
///
/// Literal double quotes are doubled. An argument that is empty or contains
/// whitespace or a single quote is wrapped in single quotes, with its own
/// single quotes doubled.
pub fn quote_arguments(arguments: &[String]) -> String {
    arguments
        .iter()
        .map(|arg| {
            let escaped = arg.replace('"', "\"\"");
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                format!("'{}'", escaped.replace('\'', "''"))
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts cluster ids from `condor_submit_dag` output
/// (`1 job(s) submitted to cluster 1234.`).
pub fn parse_cluster_ids(stdout: &str) -> Vec<u64> {
    const MARKER: &str = "submitted to cluster";
    stdout
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.split_once(MARKER)?;
            let digits: String = rest
                .trim_start()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_are_space_joined() {
        let args = vec!["--sampler".to_string(), "dynesty".to_string()];
        assert_eq!(quote_arguments(&args), "--sampler dynesty");
    }

    #[test]
    fn whitespace_and_quotes_are_escaped() {
        let args = vec![
            "--label".to_string(),
            "two words".to_string(),
            "it's".to_string(),
            "say \"hi\"".to_string(),
            String::new(),
        ];
        assert_eq!(
            quote_arguments(&args),
            "--label 'two words' 'it''s' 'say \"\"hi\"\"' ''"
        );
    }

    #[test]
    fn cluster_ids_are_parsed_from_each_line() {
        let stdout = "File for submitting this DAG to HTCondor : main.dag.condor.sub\n\
                      1 job(s) submitted to cluster 4242.\n\
                      noise\n";
        assert_eq!(parse_cluster_ids(stdout), vec![4242]);
        assert!(parse_cluster_ids("nothing here").is_empty());
    }
}
