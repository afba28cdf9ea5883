use std::collections::BTreeSet;

use sweepdag_core::derive_named_seed;

#[test]
fn named_seeds_repeat_for_the_same_master() {
    let first: Vec<u64> = (0..32)
        .map(|idx| derive_named_seed(1234, &format!("LABEL_H1_job{idx}")))
        .collect();
    let second: Vec<u64> = (0..32)
        .map(|idx| derive_named_seed(1234, &format!("LABEL_H1_job{idx}")))
        .collect();
    assert_eq!(first, second);
}

#[test]
fn distinct_names_do_not_collide() {
    let seeds: BTreeSet<u64> = (0..256)
        .map(|idx| derive_named_seed(7, &format!("job{idx}")))
        .collect();
    assert_eq!(seeds.len(), 256);
}

#[test]
fn named_seeds_depend_on_master_and_name() {
    let a = derive_named_seed(99, "LABEL_H1L1_dynesty");
    assert_ne!(a, derive_named_seed(99, "LABEL_H1_dynesty"));
    assert_ne!(a, derive_named_seed(100, "LABEL_H1L1_dynesty"));
}
