mod common;

use std::collections::BTreeSet;

use common::Fixture;
use sweepdag_core::errors::SweepError;
use sweepdag_dag::{assemble, build_graph, compile, expand, BuildOpts, JobKind};

fn assert_fully_wired(detectors: &str, samplers: &[&str], coherence_test: bool, leaves: usize) {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw(detectors, samplers, coherence_test));
    let graph = build_graph(&config, &BuildOpts::default()).expect("graph");
    assert_eq!(graph.leaf_jobs().len(), leaves);

    let leaf_names: BTreeSet<String> = graph
        .leaf_jobs()
        .iter()
        .map(|job| job.name().to_string())
        .collect();
    assert_eq!(graph.aggregation_job().parents(), &leaf_names);
    assert!(graph.leaf_jobs().iter().all(|job| job.parents().is_empty()));
    assert_eq!(graph.aggregation_job().kind(), &JobKind::Aggregation);
}

#[test]
fn aggregation_depends_on_single_leaf() {
    assert_fully_wired("H1", &["nestle"], false, 1);
}

#[test]
fn aggregation_depends_on_both_leaves() {
    assert_fully_wired("H1 L1", &["nestle", "dynesty"], false, 2);
}

#[test]
fn aggregation_depends_on_every_leaf() {
    assert_fully_wired("H1 L1 V1", &["nestle", "dynesty", "emcee"], true, 12);
}

#[test]
fn aggregation_arguments_reference_predicted_results() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1 L1", &["nestle"], true));
    let graph = build_graph(&config, &BuildOpts::default()).expect("graph");
    let run = config.run_directory().display().to_string();

    let aggregation = graph.aggregation_job();
    assert_eq!(aggregation.name(), "GW150914_combine_results");
    assert_eq!(aggregation.executable().to_str(), Some("bilby_plot"));
    assert_eq!(
        aggregation.arguments(),
        [
            "-r".to_string(),
            format!("{run}/GW150914_H1L1_nestle_result.h5"),
            format!("{run}/GW150914_H1_nestle_result.h5"),
            format!("{run}/GW150914_L1_nestle_result.h5"),
            "-f".to_string(),
            format!("{run}/GW150914_combine_results_corner.png"),
            "-l".to_string(),
            "H1L1".to_string(),
            "H1".to_string(),
            "L1".to_string(),
        ]
    );
    assert_eq!(
        aggregation.extra_directives(),
        ["accounting_group = ligo.dev.o3.cbc.pe.lalinference"]
    );
    assert_eq!(graph.name(), "main_GW150914");
    assert_eq!(
        graph.results_pages().get("GW150914_H1_nestle").map(String::as_str),
        Some("GW150914_H1_nestle.html")
    );
}

#[test]
fn empty_leaf_list_is_an_internal_error() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1", &["nestle"], false));
    let err = assemble(&config, Vec::new()).unwrap_err();
    assert!(matches!(err, SweepError::Internal(_)));
    assert_eq!(err.info().code, "assemble.no_leaves");
    assert!(!err.is_user_error());
}

#[test]
fn duplicate_leaves_are_rejected() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1", &["nestle"], false));
    let spec = expand(&config).remove(0);
    let job = compile(&config, &spec).expect("compile");
    let err = assemble(&config, vec![job.clone(), job]).unwrap_err();
    assert_eq!(err.info().code, "assemble.duplicate_name");
    assert_eq!(
        err.info().context.get("job").map(String::as_str),
        Some("GW150914_H1_nestle")
    );
}

#[test]
fn aggregation_job_cannot_be_a_leaf() {
    let fixture = Fixture::new();
    let config = fixture.config(fixture.raw("H1", &["nestle"], false));
    let graph = build_graph(&config, &BuildOpts::default()).expect("graph");
    let err = assemble(&config, vec![graph.aggregation_job().clone()]).unwrap_err();
    assert_eq!(err.info().code, "assemble.non_analysis_leaf");
}
