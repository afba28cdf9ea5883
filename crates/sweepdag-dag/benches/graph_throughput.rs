use std::fs;

use criterion::{criterion_group, criterion_main, Criterion};
use sweepdag_dag::config::{JobConfiguration, ListInput, RawConfig, Resolver};
use sweepdag_dag::{build_graph, BuildOpts, CondorBackend, SubmissionBackend};
use tempfile::tempdir;

fn bench_graph(c: &mut Criterion) {
    let dir = tempdir().expect("bench dir");
    let ini = dir.path().join("bench.ini");
    let executable = dir.path().join("analysis");
    fs::write(&ini, "").expect("ini");
    fs::write(&executable, "").expect("executable");
    let raw = RawConfig {
        detectors: Some(ListInput::One("H1 L1 V1".into())),
        sampler: Some(ListInput::One(
            "cpnest dynesty emcee nestle ptemcee pymultinest ultranest".into(),
        )),
        coherence_test: Some(true),
        accounting: Some("bench".into()),
        executable: Some(executable.display().to_string()),
        outdir: Some(dir.path().join("out")),
        sampling_seed: Some(42),
        ..RawConfig::default()
    };
    let resolver = Resolver {
        library_dir: dir.path().to_path_buf(),
        credential_source: None,
    };
    let config = JobConfiguration::from_raw(&ini, raw, &resolver).expect("config");
    let opts = BuildOpts::default();

    c.bench_function("graph_build", |b| {
        b.iter(|| build_graph(&config, &opts).expect("graph"));
    });

    let backend = CondorBackend::default();
    c.bench_function("graph_render", |b| {
        b.iter(|| {
            let graph = build_graph(&config, &opts).expect("graph");
            backend.render(&graph).expect("render")
        });
    });
}

criterion_group!(benches, bench_graph);
criterion_main!(benches);
