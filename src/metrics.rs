//! Coreference evaluation metrics.
//!
//! Each metric consumes the cluster-id maps and the partial-alignment
//! map of a [`CorefInfo`](crate::align::CorefInfo) and returns raw
//! numerator/denominator counts; the [`Evaluator`](crate::evaluator::Evaluator)
//! orients them into precision and recall and accumulates them over a
//! corpus.
//!
//! # Metrics
//!
//! - **MUC** (Vilain et al., 1995): link-based, ignores singletons.
//! - **B³** (Bagga & Baldwin, 1998): per-mention cluster purity.
//! - **CEAF-e / CEAF-m** (Luo, 2005): optimal entity/mention alignment
//!   under the φ4 / φ3 similarity.
//! - **BLANC** (Recasens & Hovy, 2011): Rand-index style average over
//!   coreference and non-coreference links, split into the `blanc_c`
//!   and `blanc_n` sub-metrics.
//! - **LEA** (Moosavi & Strube, 2016): link-based entity-aware metric
//!   with size-weighted cluster importance.
//! - **Mention overlap / mentions**: token- and mention-level detection
//!   quality.
//! - **Anaphor-level score for zeros**: per-anaphor link correctness in
//!   discourse order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::assignment::max_score_assignment;
use crate::mention::{Cluster, Mention};

/// Mention to cluster-index map for one side of a document.
pub type ClusterMap = HashMap<Mention, usize>;

/// Symmetric map of partially aligned mention pairs.
pub type AlignmentMap = HashMap<Mention, Mention>;

/// Split-antecedent lookup: split mention to its best-matching
/// counterpart on the other side with the matching score.
pub type SplitMap = HashMap<Mention, (Mention, f64)>;

/// Metric selector, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// MUC link-based score.
    Muc,
    /// B-cubed per-mention score.
    BCubed,
    /// Mention-based CEAF (φ3).
    CeafM,
    /// Entity-based CEAF (φ4).
    CeafE,
    /// BLANC, averaged over its two link classes.
    Blanc,
    /// Link-based entity-aware score.
    Lea,
    /// Token-level mention overlap.
    MentionOverlap,
    /// Anaphor-level score over zero anaphors.
    Zeros,
    /// Mention detection score.
    Mentions,
}

/// One accumulable metric function. BLANC is the only selector that
/// expands to more than one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetricKind {
    Muc,
    BCubed,
    CeafM,
    CeafE,
    BlancC,
    BlancN,
    Lea,
    MentionOverlap,
    Zeros,
    Mentions,
}

impl Metric {
    /// The sub-metrics this selector accumulates.
    pub(crate) fn kinds(self) -> &'static [MetricKind] {
        match self {
            Metric::Muc => &[MetricKind::Muc],
            Metric::BCubed => &[MetricKind::BCubed],
            Metric::CeafM => &[MetricKind::CeafM],
            Metric::CeafE => &[MetricKind::CeafE],
            Metric::Blanc => &[MetricKind::BlancC, MetricKind::BlancN],
            Metric::Lea => &[MetricKind::Lea],
            Metric::MentionOverlap => &[MetricKind::MentionOverlap],
            Metric::Zeros => &[MetricKind::Zeros],
            Metric::Mentions => &[MetricKind::Mentions],
        }
    }
}

/// Follow the partial alignment, or keep the mention as is.
fn redirect<'a>(m: &'a Mention, alignment: &'a AlignmentMap) -> &'a Mention {
    alignment.get(m).unwrap_or(m)
}

// ============================================================================
// MUC
// ============================================================================

/// MUC numerator/denominator for one direction.
///
/// Per cluster: `den += |c| - 1`, and the numerator is `|c|` minus the
/// unmatched mentions minus the number of distinct linked clusters on
/// the other side. A split antecedent consumes one link and earns back
/// its matching score when its counterpart's cluster is already
/// linked. `count_singletons` is only set in split-alignment mode,
/// where member clusters are routinely singletons.
///
/// # Returns
///
/// `(numerator, denominator)`.
#[must_use]
pub fn muc(
    clusters: &[Cluster],
    out_clusters: &[Cluster],
    mention_to_gold: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_gold: &SplitMap,
    count_singletons: bool,
) -> (f64, f64) {
    let mut tp = 0.0;
    let mut den = 0.0;
    for c in clusters {
        if c.len() == 1 && count_singletons {
            den += 1.0;
            let m = redirect(&c.mentions()[0], alignment);
            if let Some(&gid) = mention_to_gold.get(m) {
                if out_clusters.get(gid).is_some_and(|cl| cl.len() == 1) {
                    tp += 1.0;
                }
            }
            continue;
        }
        den += c.len() as f64 - 1.0;
        tp += c.len() as f64;
        let mut linked: HashSet<usize> = HashSet::new();
        let mut split_antecedent: Option<&Mention> = None;
        for m0 in c {
            let m = redirect(m0, alignment);
            if m.is_split() {
                split_antecedent = Some(m);
            } else if let Some(&gid) = mention_to_gold.get(m) {
                linked.insert(gid);
            } else {
                tp -= 1.0;
            }
        }
        if let Some(sa) = split_antecedent {
            match split_to_gold.get(sa) {
                Some((counterpart, score)) => match mention_to_gold.get(counterpart) {
                    Some(gid) if linked.contains(gid) => tp -= 1.0 - score,
                    _ => tp -= 1.0,
                },
                None => tp -= 1.0,
            }
        }
        tp -= linked.len() as f64;
    }
    (tp, den)
}

// ============================================================================
// B-cubed
// ============================================================================

/// B³ numerator/denominator for one direction.
///
/// Per cluster, the numerator adds the sum of squared per-gold-cluster
/// counts divided by the cluster size; partial and split matches
/// contribute their scores instead of 1.
#[must_use]
pub fn b_cubed(
    clusters: &[Cluster],
    mention_to_gold: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_gold: &SplitMap,
) -> (f64, f64) {
    let mut num = 0.0;
    let mut den = 0.0;
    for c in clusters {
        if c.is_empty() {
            continue;
        }
        let mut gold_counts: HashMap<usize, f64> = HashMap::new();
        for m0 in c {
            let m = redirect(m0, alignment);
            if m.is_split() {
                if let Some((counterpart, score)) = split_to_gold.get(m) {
                    if let Some(&gid) = mention_to_gold.get(counterpart) {
                        *gold_counts.entry(gid).or_insert(0.0) += score;
                    }
                }
            } else if let Some(&gid) = mention_to_gold.get(m) {
                *gold_counts.entry(gid).or_insert(0.0) += 1.0;
            }
        }
        let correct: f64 = gold_counts.values().map(|v| v * v).sum();
        num += correct / c.len() as f64;
        den += c.len() as f64;
    }
    (num, den)
}

// ============================================================================
// CEAF
// ============================================================================

/// Raw overlap between a gold cluster and a response cluster, with
/// alignment and split redirection (Luo's φ3).
fn phi3(c1: &Cluster, c2: &Cluster, alignment: &AlignmentMap, split_map: &SplitMap) -> f64 {
    let mut overlap = 0.0;
    for m0 in c1 {
        let m = redirect(m0, alignment);
        if m.is_split() {
            if let Some((counterpart, score)) = split_map.get(m) {
                if c2.contains(counterpart) {
                    overlap += score;
                }
            }
        } else if c2.contains(m) {
            overlap += 1.0;
        }
    }
    overlap
}

/// Normalized overlap `2·φ3 / (|c1| + |c2|)` (Luo's φ4).
fn phi4(c1: &Cluster, c2: &Cluster, alignment: &AlignmentMap, split_map: &SplitMap) -> f64 {
    let total = c1.len() + c2.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * phi3(c1, c2, alignment, split_map) / total as f64
}

/// Best total similarity over an optimal gold/response cluster
/// pairing.
fn ceaf_similarity(
    sys_clusters: &[Cluster],
    key_clusters: &[Cluster],
    alignment: &AlignmentMap,
    split_map: &SplitMap,
    phi: fn(&Cluster, &Cluster, &AlignmentMap, &SplitMap) -> f64,
) -> f64 {
    let scores: Vec<Vec<f64>> = key_clusters
        .iter()
        .map(|kc| {
            sys_clusters
                .iter()
                .map(|sc| phi(kc, sc, alignment, split_map))
                .collect()
        })
        .collect();
    max_score_assignment(&scores)
        .iter()
        .map(|&(i, j)| scores[i][j])
        .sum()
}

/// Entity-based CEAF. Denominators are the cluster counts of each side.
///
/// # Returns
///
/// `(p_num, p_den, r_num, r_den)`.
#[must_use]
pub fn ceaf_e(
    sys_clusters: &[Cluster],
    key_clusters: &[Cluster],
    alignment: &AlignmentMap,
    split_map: &SplitMap,
) -> (f64, f64, f64, f64) {
    let sim = ceaf_similarity(sys_clusters, key_clusters, alignment, split_map, phi4);
    (sim, sys_clusters.len() as f64, sim, key_clusters.len() as f64)
}

/// Mention-based CEAF. Denominators are the mention counts of each
/// side.
#[must_use]
pub fn ceaf_m(
    sys_clusters: &[Cluster],
    key_clusters: &[Cluster],
    alignment: &AlignmentMap,
    split_map: &SplitMap,
) -> (f64, f64, f64, f64) {
    let sim = ceaf_similarity(sys_clusters, key_clusters, alignment, split_map, phi3);
    let sys_mentions: usize = sys_clusters.iter().map(Cluster::len).sum();
    let key_mentions: usize = key_clusters.iter().map(Cluster::len).sum();
    (sim, sys_mentions as f64, sim, key_mentions as f64)
}

// ============================================================================
// LEA
// ============================================================================

/// LEA numerator/denominator for one direction.
///
/// Clusters are weighted by size; a singleton resolves iff its
/// counterpart's cluster is also a singleton; larger clusters score
/// the fraction of their links found in the other side, each link
/// weighted by the matching scores of its endpoints. Clusters holding
/// a split antecedent are weighted by `split_importance`.
#[must_use]
pub fn lea(
    input_clusters: &[Cluster],
    output_clusters: &[Cluster],
    mention_to_gold: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_gold: &SplitMap,
    split_importance: f64,
) -> (f64, f64) {
    let mut num = 0.0;
    let mut den = 0.0;
    for c in input_clusters {
        let ms = c.mentions();
        if ms.is_empty() {
            continue;
        }
        let mut has_split = false;
        let (common_links, all_links) = if ms.len() == 1 {
            let m = redirect(&ms[0], alignment);
            let resolved = mention_to_gold
                .get(m)
                .is_some_and(|&gid| output_clusters.get(gid).is_some_and(|cl| cl.len() == 1));
            (if resolved { 1.0 } else { 0.0 }, 1.0)
        } else {
            let mut common = 0.0;
            for (i, m0) in ms.iter().enumerate() {
                let mut m = redirect(m0, alignment);
                let mut link_score = 1.0;
                if m.is_split() {
                    has_split = true;
                    if let Some((counterpart, score)) = split_to_gold.get(m) {
                        m = counterpart;
                        link_score = *score;
                    }
                }
                if let Some(&gid) = mention_to_gold.get(m) {
                    for m2_0 in &ms[i + 1..] {
                        let mut m2 = redirect(m2_0, alignment);
                        let mut link_score2 = 1.0;
                        if m2.is_split() {
                            if let Some((counterpart2, score2)) = split_to_gold.get(m2) {
                                m2 = counterpart2;
                                link_score2 = *score2;
                            }
                        }
                        if mention_to_gold.get(m2) == Some(&gid) {
                            common += link_score * link_score2;
                        }
                    }
                }
            }
            (common, (ms.len() * (ms.len() - 1)) as f64 / 2.0)
        };
        let importance = if has_split { split_importance } else { 1.0 };
        num += importance * ms.len() as f64 * common_links / all_links;
        den += importance * ms.len() as f64;
    }
    (num, den)
}

// ============================================================================
// BLANC
// ============================================================================

fn within_pair_count(clusters: &[Cluster]) -> f64 {
    clusters
        .iter()
        .map(|c| (c.len() * c.len().saturating_sub(1)) as f64 / 2.0)
        .sum()
}

/// BLANC coreference-link sub-metric.
///
/// The numerator counts key within-cluster mention pairs landing in
/// the same response cluster; both denominators are within-cluster
/// pair totals.
#[must_use]
pub fn blanc_c(
    sys_clusters: &[Cluster],
    key_clusters: &[Cluster],
    mention_to_sys: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_sys: &SplitMap,
) -> (f64, f64, f64, f64) {
    let mut num = 0.0;
    for c in key_clusters {
        let ms = c.mentions();
        for (i, m0) in ms.iter().enumerate() {
            let mut m = redirect(m0, alignment);
            let mut link_score = 1.0;
            if m.is_split() {
                if let Some((counterpart, score)) = split_to_sys.get(m) {
                    m = counterpart;
                    link_score = *score;
                }
            }
            if let Some(&cid) = mention_to_sys.get(m) {
                for m2_0 in &ms[i + 1..] {
                    let m2 = redirect(m2_0, alignment);
                    if mention_to_sys.get(m2) == Some(&cid) {
                        num += link_score;
                    }
                }
            }
        }
    }
    let rd = within_pair_count(key_clusters);
    let pd = within_pair_count(sys_clusters);
    (num, pd, num, rd)
}

/// BLANC non-coreference-link sub-metric.
///
/// The numerator counts key cross-cluster mention pairs kept apart by
/// the response; denominators are the cross-cluster pair totals.
#[must_use]
pub fn blanc_n(
    sys_clusters: &[Cluster],
    key_clusters: &[Cluster],
    mention_to_sys: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_sys: &SplitMap,
) -> (f64, f64, f64, f64) {
    let mut num = 0.0;
    for (cid_idx, c) in key_clusters.iter().enumerate() {
        for m0 in c {
            let mut m = redirect(m0, alignment);
            let mut link_score = 1.0;
            if m.is_split() {
                if let Some((counterpart, score)) = split_to_sys.get(m) {
                    m = counterpart;
                    link_score = *score;
                }
            }
            if let Some(&cid) = mention_to_sys.get(m) {
                for c2 in &key_clusters[cid_idx + 1..] {
                    for m2_0 in c2 {
                        let mut m2 = redirect(m2_0, alignment);
                        let mut link_score2 = 1.0;
                        if m2.is_split() {
                            if let Some((counterpart2, score2)) = split_to_sys.get(m2) {
                                m2 = counterpart2;
                                link_score2 = *score2;
                            }
                        }
                        if let Some(&cid2) = mention_to_sys.get(m2) {
                            if cid2 != cid {
                                num += link_score * link_score2;
                            }
                        }
                    }
                }
            }
        }
    }
    let total = |clusters: &[Cluster]| -> f64 {
        let n: usize = clusters.iter().map(Cluster::len).sum();
        (n * n.saturating_sub(1)) as f64 / 2.0
    };
    let rd = total(key_clusters) - within_pair_count(key_clusters);
    let pd = total(sys_clusters) - within_pair_count(sys_clusters);
    (num, pd, num, rd)
}

// ============================================================================
// Mention-level scores
// ============================================================================

/// Token-level overlap between key and response mentions.
///
/// Exact matches count their full length on all four counters; partial
/// pairs count the shared tokens against each side's own length.
#[must_use]
pub fn mention_overlap(
    key_clusters: &[Cluster],
    sys_clusters: &[Cluster],
    alignment: &AlignmentMap,
) -> (f64, f64, f64, f64) {
    let key_set: HashSet<&Mention> = key_clusters
        .iter()
        .flat_map(|c| c.iter())
        .filter(|m| !m.is_split())
        .collect();
    let sys_set: HashSet<&Mention> = sys_clusters
        .iter()
        .flat_map(|c| c.iter())
        .filter(|m| !m.is_split())
        .collect();

    let (mut pn, mut pd, mut rn, mut rd) = (0.0, 0.0, 0.0, 0.0);
    for &km in key_set.intersection(&sys_set) {
        let l = km.word_count() as f64;
        pn += l;
        pd += l;
        rn += l;
        rd += l;
    }
    for &km in &key_set {
        if let Some(sm) = alignment.get(km) {
            let ol = km.word_overlap(sm) as f64;
            pn += ol;
            pd += sm.word_count() as f64;
            rn += ol;
            rd += km.word_count() as f64;
        } else if !sys_set.contains(km) {
            rd += km.word_count() as f64;
        }
    }
    for &sm in &sys_set {
        if !key_set.contains(sm) && !alignment.contains_key(sm) {
            pd += sm.word_count() as f64;
        }
    }
    (pn, pd, rn, rd)
}

///// Mention detection counts: correct and total response mentions after
/// alignment and split redirection.
#[must_use]
pub fn mentions_score(
    clusters: &[Cluster],
    mention_to_gold: &ClusterMap,
    alignment: &AlignmentMap,
    split_to_gold: &SplitMap,
) -> (f64, f64) {
    let mut seen: HashSet<&Mention> = HashSet::new();
    for c in clusters {
        for m0 in c {
            let m = redirect(m0, alignment);
            let m = if m.is_split() {
                split_to_gold.get(m).map_or(m, |(counterpart, _)| counterpart)
            } else {
                m
            };
            seen.insert(m);
        }
    }
    let correct = seen
        .iter()
        .filter(|m| mention_to_gold.contains_key(**m))
        .count();
    (correct as f64, seen.len() as f64)
}

// ============================================================================
// Anaphor-level score
// ============================================================================

/// Anaphor-level score restricted to zero anaphors.
#[must_use]
pub fn als_zeros(
    key_clusters: &[Cluster],
    sys_clusters: &[Cluster],
    mention_to_sys: &ClusterMap,
    alignment: &AlignmentMap,
) -> (f64, f64, f64, f64) {
    anaphor_level_score(key_clusters, sys_clusters, mention_to_sys, alignment, |m| {
        m.is_zero()
    })
}

/// Per-anaphor link correctness in discourse order.
///
/// Every non-first mention of a key cluster that passes the filter is
/// an anaphor. Its response counterpart (exact or aligned) resolves it
/// correctly when the counterpart's cluster already holds a
/// counterpart of an earlier mention of the same key cluster; a
/// counterpart in the wrong cluster is a wrong link; a missing one a
/// false negative. Unmatched response anaphors are false positives.
///
/// # Returns
///
/// `(tp, tp + fp + wl, tp, tp + fn + wl)`.
#[must_use]
pub fn anaphor_level_score(
    key_clusters: &[Cluster],
    sys_clusters: &[Cluster],
    mention_to_sys: &ClusterMap,
    alignment: &AlignmentMap,
    anaphor_filter: impl Fn(&Mention) -> bool,
) -> (f64, f64, f64, f64) {
    let (mut tp, mut fp, mut fn_, mut wl) = (0.0, 0.0, 0.0, 0.0);

    let sorted_sys: Vec<Vec<Mention>> = sys_clusters.iter().map(Cluster::sorted_mentions).collect();
    let sys_first_mentions: Vec<&Mention> =
        sorted_sys.iter().filter_map(|c| c.first()).collect();

    let mut sys_covered: HashSet<&Mention> = HashSet::new();
    let sorted_key: Vec<Vec<Mention>> = key_clusters.iter().map(Cluster::sorted_mentions).collect();
    for cluster in &sorted_key {
        let mut sys_prev_cids: HashSet<usize> = HashSet::new();
        for (i, key_anaph) in cluster.iter().enumerate() {
            let sys_anaph: Option<&Mention> = if mention_to_sys.contains_key(key_anaph) {
                Some(key_anaph)
            } else {
                alignment.get(key_anaph)
            };
            let sys_cid = sys_anaph.and_then(|sa| mention_to_sys.get(sa).copied());

            // First mentions cannot be anaphors.
            if i > 0 && anaphor_filter(key_anaph) {
                match (sys_anaph, sys_cid) {
                    (None, _) => fn_ += 1.0,
                    (Some(sa), _) if sys_first_mentions.contains(&sa) => fn_ += 1.0,
                    (Some(_), Some(cid)) if sys_prev_cids.contains(&cid) => tp += 1.0,
                    _ => wl += 1.0,
                }
                if let Some(sa) = sys_anaph {
                    sys_covered.insert(sa);
                }
            }
            if let Some(cid) = sys_cid {
                sys_prev_cids.insert(cid);
            }
        }
    }

    for cluster in &sorted_sys {
        for sys_anaph in cluster {
            if !sys_first_mentions.contains(&sys_anaph)
                && !sys_covered.contains(sys_anaph)
                && anaphor_filter(sys_anaph)
            {
                fp += 1.0;
            }
        }
    }

    (tp, tp + fp + wl, tp, tp + fn_ + wl)
}
