//! Metric behavior under partial, CRAFT and zero-mention alignment.

use corefscore::{
    align_clusters, evaluate_documents, AlignOptions, Cluster, CorefInfo, EvalConfig,
    MatchMethod, Mention, Metric, Word, ZeroMatch,
};

const TOL: f64 = 1e-4;

fn span(sent: u32, start: u32, end: u32) -> Mention {
    Mention::span(sent, start, end).unwrap()
}

fn zero(sent: u32, ord: u32, sub: u32) -> Mention {
    Mention::zero(Word::zero(sent, ord, sub)).unwrap()
}

fn score(docs: &[CorefInfo], metric: Metric) -> (f64, f64, f64) {
    let s = evaluate_documents(docs, metric, &EvalConfig::default());
    (s.recall, s.precision, s.f1)
}

fn assert_rpf(metric: Metric, actual: (f64, f64, f64), expected: (f64, f64, f64)) {
    assert!(
        (actual.0 - expected.0).abs() < TOL
            && (actual.1 - expected.1).abs() < TOL
            && (actual.2 - expected.2).abs() < TOL,
        "{metric:?}: got {actual:?}, want {expected:?}"
    );
}

#[test]
fn partial_pair_counts_as_full_coreference_match() {
    // Key mention [0..2] with MIN {1}; the response clipped it to
    // [1..2]. Cluster metrics give the pair full credit, the alignment
    // only decides who matches whom.
    let key_a = span(0, 0, 2).with_min([Word::token(0, 1)]).unwrap();
    let sys_a = span(0, 1, 2);
    let b = span(0, 5, 6);
    let key = vec![Cluster::new(vec![key_a, b.clone()])];
    let sys = vec![Cluster::new(vec![sys_a, b])];
    let opts = AlignOptions { partial_match: true, ..AlignOptions::default() };
    let docs = vec![align_clusters(key, sys, &opts)];

    assert_rpf(Metric::Muc, score(&docs, Metric::Muc), (1.0, 1.0, 1.0));
    assert_rpf(Metric::BCubed, score(&docs, Metric::BCubed), (1.0, 1.0, 1.0));
    // Token overlap does see the clipped words: the exact pair counts
    // 2 on every counter, the partial pair counts its 2 shared tokens
    // against response length 2 and key length 3.
    assert_rpf(
        Metric::MentionOverlap,
        score(&docs, Metric::MentionOverlap),
        (0.8, 1.0, 8.0 / 9.0),
    );
}

#[test]
fn without_partial_matching_the_clipped_mention_is_lost() {
    let key_a = span(0, 0, 2).with_min([Word::token(0, 1)]).unwrap();
    let sys_a = span(0, 1, 2);
    let b = span(0, 5, 6);
    let key = vec![Cluster::new(vec![key_a, b.clone()])];
    let sys = vec![Cluster::new(vec![sys_a, b])];
    let docs = vec![align_clusters(key, sys, &AlignOptions::default())];

    // One recoverable link on each side, none recovered.
    assert_rpf(Metric::Muc, score(&docs, Metric::Muc), (0.0, 0.0, 0.0));
}

#[test]
fn craft_alignment_matches_inside_min_window() {
    let key_c = span(0, 10, 13)
        .with_min([Word::token(0, 11), Word::token(0, 12)])
        .unwrap();
    let sys_c = span(0, 11, 12);
    let d = span(0, 20, 20);
    let key = vec![Cluster::new(vec![key_c, d.clone()])];
    let sys = vec![Cluster::new(vec![sys_c, d])];
    let opts = AlignOptions {
        partial_match: true,
        match_method: MatchMethod::Craft,
        ..AlignOptions::default()
    };
    let docs = vec![align_clusters(key, sys, &opts)];

    assert_rpf(Metric::Muc, score(&docs, Metric::Muc), (1.0, 1.0, 1.0));
    // Exact singleton-word pair d plus 2 shared tokens out of response
    // length 2 and key length 4.
    assert_rpf(
        Metric::MentionOverlap,
        score(&docs, Metric::MentionOverlap),
        (0.6, 1.0, 0.75),
    );
}

#[test]
fn dependent_zeros_score_anaphors_across_sub_indices() {
    // Both zeros sit on the same anchor tokens but carry different
    // sub-indices, as two independent annotation runs would.
    let key = vec![Cluster::new(vec![span(0, 0, 0), zero(0, 3, 1), zero(1, 2, 1)])];
    let sys = vec![Cluster::new(vec![span(0, 0, 0), zero(0, 3, 2), zero(1, 2, 5)])];
    let opts = AlignOptions {
        keep_zeros: true,
        zero_match: ZeroMatch::Dependent,
        ..AlignOptions::default()
    };
    let docs = vec![align_clusters(key, sys, &opts)];
    assert_rpf(Metric::Zeros, score(&docs, Metric::Zeros), (1.0, 1.0, 1.0));
}

#[test]
fn zero_anaphor_in_wrong_cluster_is_a_wrong_link() {
    let key = vec![Cluster::new(vec![span(0, 0, 0), zero(0, 3, 1), zero(1, 2, 1)])];
    let sys = vec![
        Cluster::new(vec![span(0, 0, 0), zero(0, 3, 2)]),
        Cluster::new(vec![span(1, 0, 0), zero(1, 2, 5)]),
    ];
    let opts = AlignOptions {
        keep_zeros: true,
        zero_match: ZeroMatch::Dependent,
        ..AlignOptions::default()
    };
    let docs = vec![align_clusters(key, sys, &opts)];
    // One zero resolved correctly, one linked into a foreign cluster.
    assert_rpf(Metric::Zeros, score(&docs, Metric::Zeros), (0.5, 0.5, 0.5));
}

#[test]
fn linear_zero_matching_requires_identity() {
    let key = vec![Cluster::new(vec![span(0, 0, 0), zero(0, 3, 1)])];
    let sys = vec![Cluster::new(vec![span(0, 0, 0), zero(0, 3, 2)])];
    let opts = AlignOptions { keep_zeros: true, ..AlignOptions::default() };
    let docs = vec![align_clusters(key, sys, &opts)];
    assert_rpf(Metric::Zeros, score(&docs, Metric::Zeros), (0.0, 0.0, 0.0));
}

#[test]
fn mention_detection_counts_aligned_mentions() {
    let key_a = span(0, 0, 2).with_min([Word::token(0, 1)]).unwrap();
    let sys_a = span(0, 1, 2);
    let b = span(0, 5, 6);
    let junk = span(0, 9, 9);
    let key = vec![Cluster::new(vec![key_a, b.clone()])];
    let sys = vec![Cluster::new(vec![sys_a, b]), Cluster::new(vec![junk])];
    let opts = AlignOptions { partial_match: true, ..AlignOptions::default() };
    let docs = vec![align_clusters(key, sys, &opts)];

    // Both key mentions are recovered; the junk singleton is a false
    // positive.
    assert_rpf(
        Metric::Mentions,
        score(&docs, Metric::Mentions),
        (1.0, 2.0 / 3.0, 0.8),
    );
}
