//! Expansion of a validated configuration into the job list.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JobConfiguration;
use crate::detectors::DetectorSet;

/// One analysis job to compile: a detector subset paired with a sampler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobSpecification {
    detector_subset: DetectorSet,
    sampler: String,
}

impl JobSpecification {
    pub(crate) fn new(detector_subset: DetectorSet, sampler: impl Into<String>) -> Self {
        Self {
            detector_subset,
            sampler: sampler.into(),
        }
    }

    pub fn detector_subset(&self) -> &DetectorSet {
        &self.detector_subset
    }

    pub fn sampler(&self) -> &str {
        &self.sampler
    }
}

/// Produces the ordered job list for `config`.
///
/// Subsets come first: the full detector set, then (with the coherence test
/// enabled) one singleton per detector in sorted order. Each subset is paired
/// with every sampler in configured order, samplers varying fastest.
///
/// A singleton equal to the full set is not emitted twice, so a one-detector
/// coherence run produces the same jobs as a plain run.
pub fn expand(config: &JobConfiguration) -> Vec<JobSpecification> {
    let full = config.detectors().clone();
    let mut subsets = vec![full.clone()];
    if config.coherence_test() {
        for id in full.iter() {
            let singleton = DetectorSet::singleton(id);
            if singleton == full {
                debug!(detector = id, "singleton equals the full detector set, skipping");
                continue;
            }
            subsets.push(singleton);
        }
    }

    let jobs: Vec<JobSpecification> = subsets
        .iter()
        .flat_map(|subset| {
            config
                .samplers()
                .iter()
                .map(move |sampler| JobSpecification::new(subset.clone(), sampler.clone()))
        })
        .collect();
    debug!(
        subsets = subsets.len(),
        samplers = config.samplers().len(),
        jobs = jobs.len(),
        "expanded job set"
    );
    jobs
}
