//! Sweep configuration: raw key/value input and the validated, immutable
//! [`JobConfiguration`] built from it.
//!
//! Construction is all-or-nothing. Every check on user input (detectors,
//! samplers, accounting tag, label, queue, executable, explicit credential)
//! runs before the run directory is created, so a rejected configuration
//! leaves nothing behind.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use sweepdag_core::errors::{ErrorInfo, SweepError};
use sweepdag_core::registry::Registry;
use tracing::{debug, warn};

use crate::detectors::{split_tokens, DetectorSet};
use crate::serde::from_yaml_slice;

/// Environment variable naming the fallback credential (X509 proxy) file.
pub const CREDENTIAL_ENV: &str = "X509_USER_PROXY";

/// Environment variable overriding the executable library directory.
pub const LIBRARY_DIR_ENV: &str = "SWEEPDAG_LIBRARY_DIR";

/// Extension tried when the bare library path does not exist.
pub const EXECUTABLE_EXTENSION: &str = "py";

const DEFAULT_DETECTORS: &str = "H1 L1";
const DEFAULT_SAMPLER: &str = "dynesty";
const DEFAULT_LABEL: &str = "LABEL";
const DEFAULT_OUTDIR: &str = "bilby_outdir";
const DEFAULT_AGGREGATION_EXECUTABLE: &str = "bilby_plot";

/// A value given either as one (possibly delimited) string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    /// `detectors: "H1 L1"`
    One(String),
    /// `detectors: [H1, L1]`
    Many(Vec<String>),
}

impl ListInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListInput::One(value) => vec![value],
            ListInput::Many(values) => values,
        }
    }
}

impl From<Vec<String>> for ListInput {
    fn from(values: Vec<String>) -> Self {
        ListInput::Many(values)
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
        Scalar::Text(value) => value,
    }))
}

/// Unvalidated configuration as read from a YAML file or command-line flags.
///
/// Unknown keys are ignored. Every field is optional so that file values and
/// flag overrides can be layered with [`RawConfig::overlay`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawConfig {
    #[serde(default, alias = "include-detectors")]
    pub detectors: Option<ListInput>,
    #[serde(default)]
    pub sampler: Option<ListInput>,
    #[serde(default)]
    pub coherence_test: Option<bool>,
    #[serde(default)]
    pub accounting: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default, rename = "X509", alias = "x509")]
    pub x509: Option<PathBuf>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub outdir: Option<PathBuf>,
    #[serde(default)]
    pub queue: Option<u32>,
    #[serde(default)]
    pub submit: Option<bool>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub request_memory: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub request_disk: Option<String>,
    #[serde(default)]
    pub request_cpus: Option<u32>,
    #[serde(default)]
    pub universe: Option<String>,
    #[serde(default)]
    pub getenv: Option<bool>,
    #[serde(default)]
    pub notification: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub retry: Option<u32>,
    #[serde(default)]
    pub aggregation_executable: Option<String>,
    #[serde(default)]
    pub sampling_seed: Option<u64>,
    #[serde(default)]
    pub extra_detectors: Option<ListInput>,
    #[serde(default)]
    pub passthrough: Vec<String>,
}

impl RawConfig {
    /// Reads a YAML configuration file. An empty file yields all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| {
            SweepError::Config(
                ErrorInfo::new("config.read", err.to_string())
                    .with_context("field", "ini")
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        from_yaml_slice(&bytes)
    }

    /// Layers `over` on top of `self`: every value set in `over` wins and
    /// passthrough arguments are appended after the ones already present.
    pub fn overlay(self, over: RawConfig) -> RawConfig {
        let mut passthrough = self.passthrough;
        passthrough.extend(over.passthrough);
        RawConfig {
            detectors: over.detectors.or(self.detectors),
            sampler: over.sampler.or(self.sampler),
            coherence_test: over.coherence_test.or(self.coherence_test),
            accounting: over.accounting.or(self.accounting),
            executable: over.executable.or(self.executable),
            x509: over.x509.or(self.x509),
            label: over.label.or(self.label),
            outdir: over.outdir.or(self.outdir),
            queue: over.queue.or(self.queue),
            submit: over.submit.or(self.submit),
            request_memory: over.request_memory.or(self.request_memory),
            request_disk: over.request_disk.or(self.request_disk),
            request_cpus: over.request_cpus.or(self.request_cpus),
            universe: over.universe.or(self.universe),
            getenv: over.getenv.or(self.getenv),
            notification: over.notification.or(self.notification),
            requirements: over.requirements.or(self.requirements),
            retry: over.retry.or(self.retry),
            aggregation_executable: over.aggregation_executable.or(self.aggregation_executable),
            sampling_seed: over.sampling_seed.or(self.sampling_seed),
            extra_detectors: over.extra_detectors.or(self.extra_detectors),
            passthrough,
        }
    }
}

/// Resource requests forwarded to the scheduler without validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequests {
    pub memory: Option<String>,
    pub disk: Option<String>,
    pub cpus: Option<u32>,
}

/// Scheduler directives applied to every job in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    pub universe: String,
    pub getenv: bool,
    pub notification: String,
    pub requirements: Option<String>,
    pub retry: Option<u32>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            universe: "vanilla".to_string(),
            getenv: true,
            notification: "never".to_string(),
            requirements: None,
            retry: None,
        }
    }
}

/// Resolves environment-dependent inputs: the executable library and the
/// fallback credential source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    /// Directory searched for executables given by name.
    pub library_dir: PathBuf,
    /// Credential file to copy when no explicit credential is configured.
    pub credential_source: Option<PathBuf>,
}

impl Resolver {
    /// Reads [`LIBRARY_DIR_ENV`] and [`CREDENTIAL_ENV`] from the process
    /// environment. The library defaults to `lib_scripts` next to the running
    /// executable.
    pub fn from_env() -> Self {
        let library_dir = env::var_os(LIBRARY_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_library_dir);
        let credential_source = env::var_os(CREDENTIAL_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self {
            library_dir,
            credential_source,
        }
    }

    /// Resolves an executable given as a path or a library name.
    ///
    /// Tried in order: the literal path, `library_dir/name`, then
    /// `library_dir/name.py`. The first existing file wins.
    pub fn resolve_executable(&self, executable: &str) -> Result<PathBuf, SweepError> {
        let literal = PathBuf::from(executable);
        let in_library = self.library_dir.join(executable);
        let mut with_extension = in_library.clone().into_os_string();
        with_extension.push(".");
        with_extension.push(EXECUTABLE_EXTENSION);
        let with_extension = PathBuf::from(with_extension);
        for candidate in [literal, in_library, with_extension] {
            if candidate.is_file() {
                debug!(executable, resolved = %candidate.display(), "resolved executable");
                return Ok(candidate);
            }
        }
        Err(SweepError::Config(
            ErrorInfo::new("config.executable", "unable to identify executable")
                .with_context("field", "executable")
                .with_context("executable", executable)
                .with_context("library_dir", self.library_dir.display().to_string()),
        ))
    }

    /// Resolves the credential used by every job.
    ///
    /// An explicit path must exist. Without one, the configured source is
    /// copied to `run_dir/.<file name>`; a missing source only warns.
    pub fn resolve_credential(
        &self,
        explicit: Option<&Path>,
        run_dir: &Path,
    ) -> Result<Option<PathBuf>, SweepError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(credential_not_a_file(path));
        }
        let Some(source) = &self.credential_source else {
            warn!(
                variable = CREDENTIAL_ENV,
                "credential environment variable not set, jobs will run without a proxy"
            );
            return Ok(None);
        };
        if !source.is_file() {
            warn!(
                variable = CREDENTIAL_ENV,
                path = %source.display(),
                "credential environment variable does not point to a file, jobs will run without a proxy"
            );
            return Ok(None);
        }
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "x509up".to_string());
        let copy = run_dir.join(format!(".{file_name}"));
        fs::copy(source, &copy)
            .map_err(|err| SweepError::io("config.credential_copy", &copy, err))?;
        debug!(source = %source.display(), copy = %copy.display(), "copied credential");
        Ok(Some(copy))
    }
}

fn credential_not_a_file(path: &Path) -> SweepError {
    SweepError::Config(
        ErrorInfo::new("config.credential", "X509 credential is not a file")
            .with_context("field", "X509")
            .with_context("path", path.display().to_string()),
    )
}

fn default_library_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("lib_scripts")))
        .unwrap_or_else(|| PathBuf::from("lib_scripts"))
}

/// Validated sweep description. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobConfiguration {
    ini: PathBuf,
    detectors: DetectorSet,
    samplers: Vec<String>,
    coherence_test: bool,
    accounting_tag: String,
    resources: ResourceRequests,
    scheduler: SchedulerOptions,
    executable: PathBuf,
    aggregation_executable: PathBuf,
    credential_path: Option<PathBuf>,
    label: String,
    run_directory: PathBuf,
    queue: u32,
    submit: bool,
    sampling_seed: Option<u64>,
    passthrough: Vec<String>,
}

impl JobConfiguration {
    /// Validates `raw` and resolves its environment-dependent fields.
    ///
    /// `ini` is the configuration file handed to every analysis job; it must
    /// exist and is stored as an absolute path.
    pub fn from_raw(
        ini: impl AsRef<Path>,
        raw: RawConfig,
        resolver: &Resolver,
    ) -> Result<Self, SweepError> {
        let ini = ini.as_ref();
        if !ini.is_file() {
            return Err(SweepError::Config(
                ErrorInfo::new("config.ini", "configuration file not found")
                    .with_context("field", "ini")
                    .with_context("path", ini.display().to_string()),
            ));
        }
        let ini = fs::canonicalize(ini).map_err(|err| SweepError::io("config.ini", ini, err))?;

        let mut registry = Registry::detectors();
        for extra in raw
            .extra_detectors
            .map(ListInput::into_vec)
            .unwrap_or_default()
            .iter()
            .flat_map(|token| split_tokens(token))
        {
            let canonical = registry.normalize(&extra);
            if !canonical.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(SweepError::Config(
                    ErrorInfo::new(
                        "config.extra_detectors",
                        "detector identifiers must be ASCII alphanumeric",
                    )
                    .with_context("field", "extra-detectors")
                    .with_context("token", canonical),
                ));
            }
            registry.register(&canonical);
            debug!(detector = %canonical, "registered extra detector");
        }
        let detector_input = raw
            .detectors
            .map(ListInput::into_vec)
            .unwrap_or_else(|| vec![DEFAULT_DETECTORS.to_string()]);
        let detectors = DetectorSet::parse(&detector_input, &registry)?;

        let samplers = normalize_samplers(
            raw.sampler
                .map(ListInput::into_vec)
                .unwrap_or_else(|| vec![DEFAULT_SAMPLER.to_string()]),
        )?;

        let accounting_tag = required("accounting", raw.accounting)?;
        let label = validate_label(raw.label.unwrap_or_else(|| DEFAULT_LABEL.to_string()))?;
        let queue = raw.queue.unwrap_or(1);
        if queue == 0 {
            return Err(SweepError::config(
                "config.queue",
                "queue",
                "queue must request at least one process",
            ));
        }

        let executable = required("executable", raw.executable)?;
        let executable = resolver.resolve_executable(&executable)?;
        let executable = fs::canonicalize(&executable)
            .map_err(|err| SweepError::io("config.executable", &executable, err))?;
        let aggregation_executable = PathBuf::from(
            raw.aggregation_executable
                .unwrap_or_else(|| DEFAULT_AGGREGATION_EXECUTABLE.to_string()),
        );

        if let Some(explicit) = raw.x509.as_deref() {
            if !explicit.is_file() {
                return Err(credential_not_a_file(explicit));
            }
        }

        let outdir = raw.outdir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR));
        fs::create_dir_all(&outdir)
            .map_err(|err| SweepError::io("config.outdir", &outdir, err))?;
        let run_directory = fs::canonicalize(&outdir)
            .map_err(|err| SweepError::io("config.outdir", &outdir, err))?;

        let credential_path = resolver.resolve_credential(raw.x509.as_deref(), &run_directory)?;

        let defaults = SchedulerOptions::default();
        let config = Self {
            ini,
            detectors,
            samplers,
            coherence_test: raw.coherence_test.unwrap_or(false),
            accounting_tag,
            resources: ResourceRequests {
                memory: raw.request_memory,
                disk: raw.request_disk,
                cpus: raw.request_cpus,
            },
            scheduler: SchedulerOptions {
                universe: raw.universe.unwrap_or(defaults.universe),
                getenv: raw.getenv.unwrap_or(defaults.getenv),
                notification: raw.notification.unwrap_or(defaults.notification),
                requirements: raw.requirements,
                retry: raw.retry,
            },
            executable,
            aggregation_executable,
            credential_path,
            label,
            run_directory,
            queue,
            submit: raw.submit.unwrap_or(false),
            sampling_seed: raw.sampling_seed,
            passthrough: raw.passthrough,
        };
        debug!(
            label = %config.label,
            detectors = %config.detectors,
            samplers = ?config.samplers,
            coherence_test = config.coherence_test,
            "validated job configuration"
        );
        Ok(config)
    }

    /// Absolute path of the configuration file passed to every analysis job.
    pub fn ini(&self) -> &Path {
        &self.ini
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Samplers in configured order, duplicates removed.
    pub fn samplers(&self) -> &[String] {
        &self.samplers
    }

    pub fn coherence_test(&self) -> bool {
        self.coherence_test
    }

    pub fn accounting_tag(&self) -> &str {
        &self.accounting_tag
    }

    pub fn resources(&self) -> &ResourceRequests {
        &self.resources
    }

    pub fn scheduler(&self) -> &SchedulerOptions {
        &self.scheduler
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Program run by the aggregation job. Passed to the scheduler verbatim.
    pub fn aggregation_executable(&self) -> &Path {
        &self.aggregation_executable
    }

    pub fn credential_path(&self) -> Option<&Path> {
        self.credential_path.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn run_directory(&self) -> &Path {
        &self.run_directory
    }

    /// Processes queued per analysis job.
    pub fn queue(&self) -> u32 {
        self.queue
    }

    /// True when the rendered graph should also be submitted.
    pub fn submit(&self) -> bool {
        self.submit
    }

    pub fn sampling_seed(&self) -> Option<u64> {
        self.sampling_seed
    }

    /// Arguments appended verbatim to every analysis job.
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Directory holding the rendered submission files.
    pub fn submit_directory(&self) -> PathBuf {
        self.run_directory.join("submit")
    }

    /// Directory holding per-job scheduler logs.
    pub fn log_directory(&self) -> PathBuf {
        self.run_directory.join("logs")
    }

    /// Predicted result artifact for the job called `name`.
    pub fn result_path(&self, name: &str) -> PathBuf {
        self.run_directory.join(format!("{name}_result.h5"))
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, SweepError> {
    match value.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SweepError::config(
            format!("config.{field}"),
            field,
            format!("{field} is required and must not be empty"),
        )),
    }
}

fn validate_label(label: String) -> Result<String, SweepError> {
    let label = label.trim().to_string();
    if label.is_empty() {
        return Err(SweepError::config("config.label", "label", "label must not be empty"));
    }
    if label.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
        return Err(SweepError::Config(
            ErrorInfo::new(
                "config.label",
                "label must not contain whitespace or path separators",
            )
            .with_context("field", "label")
            .with_context("label", label),
        ));
    }
    Ok(label)
}

fn normalize_samplers(input: Vec<String>) -> Result<Vec<String>, SweepError> {
    let catalogue = Registry::samplers();
    let mut samplers: Vec<String> = Vec::new();
    for token in input.iter().flat_map(|token| split_tokens(token)) {
        let sampler = catalogue.normalize(&token);
        if sampler.contains(['/', '\\']) {
            return Err(SweepError::Config(
                ErrorInfo::new("config.sampler", "sampler must not contain path separators")
                    .with_context("field", "sampler")
                    .with_context("sampler", sampler),
            ));
        }
        if samplers.contains(&sampler) {
            warn!(sampler = %sampler, "sampler listed more than once, ignoring repeat");
            continue;
        }
        if !catalogue.contains(&sampler) {
            warn!(sampler = %sampler, known = %catalogue, "sampler not in the known sampler list");
        }
        samplers.push(sampler);
    }
    if samplers.is_empty() {
        return Err(SweepError::config(
            "config.sampler",
            "sampler",
            "at least one sampler must be given",
        ));
    }
    Ok(samplers)
}
