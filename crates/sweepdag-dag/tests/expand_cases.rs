mod common;

use std::collections::BTreeSet;

use common::Fixture;
use proptest::prelude::*;
use sweepdag_core::registry::Registry;
use sweepdag_dag::{build_graph, expand, BuildOpts, DetectorSet, JobSpecification};

fn pairs(specs: &[JobSpecification]) -> Vec<(String, String)> {
    specs
        .iter()
        .map(|spec| (spec.detector_subset().joined(), spec.sampler().to_string()))
        .collect()
}

fn pair(detectors: &str, sampler: &str) -> (String, String) {
    (detectors.to_string(), sampler.to_string())
}

#[test]
fn two_detectors_one_sampler_yields_one_job() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1 L1", &["nestle"], false));
    assert_eq!(pairs(&expand(&config)), vec![pair("H1L1", "nestle")]);
}

#[test]
fn coherence_test_adds_one_job_per_detector() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("L1 H1", &["nestle"], true));
    assert_eq!(
        pairs(&expand(&config)),
        vec![pair("H1L1", "nestle"), pair("H1", "nestle"), pair("L1", "nestle")]
    );
}

#[test]
fn samplers_vary_fastest() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1,L1", &["nestle", "dynesty"], true));
    assert_eq!(
        pairs(&expand(&config)),
        vec![
            pair("H1L1", "nestle"),
            pair("H1L1", "dynesty"),
            pair("H1", "nestle"),
            pair("H1", "dynesty"),
            pair("L1", "nestle"),
            pair("L1", "dynesty"),
        ]
    );

    let plain = fixture.config(fixture.raw("H1,L1", &["nestle", "dynesty"], false));
    assert_eq!(
        pairs(&expand(&plain)),
        vec![pair("H1L1", "nestle"), pair("H1L1", "dynesty")]
    );
}

#[test]
fn single_detector_coherence_run_is_not_duplicated() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1", &["nestle"], true));
    assert_eq!(pairs(&expand(&config)), vec![pair("H1", "nestle")]);
}

#[test]
fn compiled_names_are_distinct_and_ordered() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1 L1 V1", &["nestle", "dynesty"], true));
    let graph = build_graph(&config, &BuildOpts { concurrency: 4 }).expect("graph");
    let names: Vec<&str> = graph.leaf_jobs().iter().map(|job| job.name()).collect();
    assert_eq!(names.len(), 8);
    assert_eq!(names.iter().collect::<BTreeSet<_>>().len(), names.len());
    assert_eq!(names[0], "GW150914_H1L1V1_nestle");
    assert_eq!(names[1], "GW150914_H1L1V1_dynesty");
    assert_eq!(names[7], "GW150914_V1_dynesty");
}

fn detector_subset() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(vec!["H1", "L1", "V1"], 1..=3)
}

proptest! {
    #[test]
    fn delimited_and_tokenised_input_agree(ids in detector_subset(), lower in any::<bool>()) {
        let registry = Registry::detectors();
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| if lower { id.to_lowercase() } else { id.to_string() })
            .collect();
        let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
        let bracketed = format!("[{}]", quoted.join(", "));
        let spaced = ids.join(" ");

        let from_tokens = DetectorSet::parse(&ids, &registry).expect("tokens");
        let from_brackets = DetectorSet::parse(&[bracketed], &registry).expect("brackets");
        let from_spaces = DetectorSet::parse(&[spaced], &registry).expect("spaces");
        prop_assert_eq!(&from_tokens, &from_brackets);
        prop_assert_eq!(&from_tokens, &from_spaces);
        prop_assert_eq!(from_tokens.len(), ids.len());
    }

    #[test]
    fn job_names_never_collide(
        ids in detector_subset(),
        samplers in proptest::sample::subsequence(vec!["nestle", "dynesty", "emcee", "cpnest"], 1..=4),
        coherence_test in any::<bool>(),
    ) {
        let fixture = Fixture::new();
        let config = fixture.config(fixture.raw(&ids.join(" "), &samplers, coherence_test));
        let graph = build_graph(&config, &BuildOpts::default()).expect("graph");
        let names: BTreeSet<&str> = graph.jobs().map(|job| job.name()).collect();
        prop_assert_eq!(names.len(), graph.leaf_jobs().len() + 1);
    }
}
