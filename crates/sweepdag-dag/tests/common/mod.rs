#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sweepdag_dag::config::{JobConfiguration, ListInput, RawConfig, Resolver};
use tempfile::TempDir;

/// Scratch workspace holding an ini file, an executable and a run directory.
pub struct Fixture {
    pub dir: TempDir,
    pub ini: PathBuf,
    pub executable: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let ini = dir.path().join("GW150914.ini");
        let executable = dir.path().join("bilby_pipe_analysis");
        fs::write(&ini, "trigger-time: 1126259462\n").expect("write ini");
        fs::write(&executable, "#!/bin/sh\n").expect("write executable");
        fs::create_dir_all(dir.path().join("lib")).expect("library dir");
        Self {
            dir,
            ini,
            executable,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn outdir(&self) -> PathBuf {
        self.path().join("outdir")
    }

    /// Minimal valid raw configuration.
    pub fn raw(&self, detectors: &str, samplers: &[&str], coherence_test: bool) -> RawConfig {
        RawConfig {
            detectors: Some(ListInput::One(detectors.to_string())),
            sampler: Some(ListInput::Many(
                samplers.iter().map(|s| s.to_string()).collect(),
            )),
            coherence_test: Some(coherence_test),
            accounting: Some("ligo.dev.o3.cbc.pe.lalinference".into()),
            executable: Some(self.executable.display().to_string()),
            outdir: Some(self.outdir()),
            label: Some("GW150914".into()),
            ..RawConfig::default()
        }
    }

    pub fn resolver(&self) -> Resolver {
        Resolver {
            library_dir: self.path().join("lib"),
            credential_source: None,
        }
    }

    pub fn config(&self, raw: RawConfig) -> JobConfiguration {
        JobConfiguration::from_raw(&self.ini, raw, &self.resolver()).expect("valid configuration")
    }
}
